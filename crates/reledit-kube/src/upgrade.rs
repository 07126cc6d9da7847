//! Recording a new release revision from edited values
//!
//! Rendering and applying manifests is out of scope here: an upgrade
//! records revision `n+1` with the new user-supplied values, supersedes
//! revision `n` and marks the new one deployed.
//!
//! Once revision `n+1` may have been written, any failure (including the
//! deadline expiring) leaves it marked failed rather than pending, so the
//! next edit can proceed from it.

use async_trait::async_trait;
use reledit_core::Values;
use tokio::time::Instant;

use crate::actions::UpgradeOptions;
use crate::error::{KubeError, Result};
use crate::release::{DEFAULT_OPERATION_TIMEOUT, ReleaseState, StoredRelease};
use crate::storage::{StorageDriver, prune_history};

/// Bound on the writes that mark an abandoned revision as failed
const ABANDON_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Applies new user-supplied values to a release
#[async_trait]
pub trait UpgradeExecutor: Send + Sync {
    /// Upgrade `current` so that it runs with `overrides`
    ///
    /// Returns the new revision.
    async fn upgrade(
        &self,
        current: &StoredRelease,
        overrides: Values,
        options: &UpgradeOptions,
    ) -> Result<StoredRelease>;
}

/// Upgrade executor backed by a release store
pub struct ReleaseUpgrader<S: StorageDriver> {
    storage: S,
}

impl<S: StorageDriver> ReleaseUpgrader<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Access the storage driver
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Check the release can be upgraded and build the pending revision
    ///
    /// Nothing is written here.
    async fn prepare(
        &self,
        current: &StoredRelease,
        overrides: Values,
        options: &UpgradeOptions,
    ) -> Result<(StoredRelease, StoredRelease)> {
        let existing = self
            .storage
            .get_latest(&current.namespace, &current.name)
            .await?;

        if existing.version != current.version {
            return Err(KubeError::ReleaseChanged {
                name: current.name.clone(),
                expected: current.version,
                found: existing.version,
            });
        }

        if existing.state.is_pending() {
            if existing.is_stuck() {
                return Err(KubeError::StuckRelease {
                    name: existing.name.clone(),
                    status: existing.state.status_name().to_string(),
                    elapsed: existing
                        .state
                        .elapsed()
                        .map(|d| format!("{} seconds", d.num_seconds()))
                        .unwrap_or_else(|| "unknown".to_string()),
                });
            }
            return Err(KubeError::OperationInProgress {
                name: existing.name.clone(),
                status: existing.state.to_string(),
            });
        }

        let pending_timeout =
            chrono::Duration::from_std(options.timeout).unwrap_or(DEFAULT_OPERATION_TIMEOUT);
        let mut release = StoredRelease::for_upgrade(&existing, overrides, pending_timeout);
        release.description = options.description.clone();
        for (k, v) in &options.labels {
            release.labels.insert(k.clone(), v.clone());
        }

        Ok((existing, release))
    }

    /// Write the pending revision, supersede the previous one and deploy
    async fn apply(
        &self,
        previous: StoredRelease,
        mut release: StoredRelease,
        options: &UpgradeOptions,
    ) -> Result<StoredRelease> {
        self.storage.create(&release).await?;

        let mut previous = previous;
        previous.mark_superseded();
        self.storage.update(&previous).await?;

        release.mark_deployed();
        self.storage.update(&release).await?;

        if options.wait {
            self.confirm_deployed(&release).await?;
        }

        Ok(release)
    }

    /// Mark a revision that may have been written as failed
    ///
    /// Best effort: problems are logged, the original error is what the
    /// caller reports.
    async fn abandon(&self, release: &StoredRelease, reason: &str) {
        let stored = match tokio::time::timeout(
            ABANDON_TIMEOUT,
            self.storage
                .get(&release.namespace, &release.name, release.version),
        )
        .await
        {
            Ok(Ok(stored)) => stored,
            Ok(Err(e)) if e.is_not_found() => return,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, revision = release.version, "could not read abandoned revision");
                return;
            }
            Err(_) => {
                tracing::warn!(revision = release.version, "timed out reading abandoned revision");
                return;
            }
        };

        // A concurrent writer may own this revision number
        if stored.created_at != release.created_at {
            return;
        }
        if matches!(stored.state, ReleaseState::Failed { .. }) {
            return;
        }

        let mut failed = stored;
        failed.mark_failed(reason.to_string());
        match tokio::time::timeout(ABANDON_TIMEOUT, self.storage.update(&failed)).await {
            Ok(Ok(())) => tracing::info!(
                release = %failed.name,
                revision = failed.version,
                "marked abandoned revision as failed"
            ),
            Ok(Err(e)) => tracing::warn!(error = %e, "could not record failed revision"),
            Err(_) => tracing::warn!("timed out recording failed revision"),
        }
    }

    async fn confirm_deployed(&self, release: &StoredRelease) -> Result<()> {
        let stored = self
            .storage
            .get(&release.namespace, &release.name, release.version)
            .await?;

        if stored.state != ReleaseState::Deployed {
            return Err(KubeError::UpgradeFailed {
                name: release.name.clone(),
                message: format!(
                    "revision {} is {} instead of deployed",
                    release.version, stored.state
                ),
            });
        }
        Ok(())
    }
}

fn deadline_after(timeout: std::time::Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + std::time::Duration::from_secs(60 * 60 * 24 * 365))
}

fn timed_out(options: &UpgradeOptions) -> KubeError {
    KubeError::Timeout(format!("{}s", options.timeout.as_secs_f64()))
}

#[async_trait]
impl<S: StorageDriver> UpgradeExecutor for ReleaseUpgrader<S> {
    async fn upgrade(
        &self,
        current: &StoredRelease,
        overrides: Values,
        options: &UpgradeOptions,
    ) -> Result<StoredRelease> {
        let deadline = deadline_after(options.timeout);

        let (previous, release) =
            tokio::time::timeout_at(deadline, self.prepare(current, overrides, options))
                .await
                .map_err(|_| timed_out(options))??;

        let outcome = tokio::time::timeout_at(deadline, self.apply(previous, release.clone(), options))
            .await
            .unwrap_or_else(|_| Err(timed_out(options)));

        let release = match outcome {
            Ok(release) => release,
            Err(e) => {
                self.abandon(&release, &e.to_string()).await;
                return Err(e);
            }
        };

        if let Some(max_history) = options.max_history {
            if let Err(e) =
                prune_history(&self.storage, &release.namespace, &release.name, max_history).await
            {
                tracing::warn!(error = %e, "could not prune release history");
            }
        }

        tracing::info!(
            release = %release.name,
            namespace = %release.namespace,
            revision = release.version,
            "recorded upgraded release"
        );

        Ok(release)
    }
}
