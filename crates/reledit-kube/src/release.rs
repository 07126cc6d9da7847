//! Stored release records and their state machine

use chrono::{DateTime, Duration, Utc};
use reledit_core::{PackMetadata, Values};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default timeout for pending operations (5 minutes)
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::minutes(5);

/// A stored release revision
///
/// The pack defaults and the user-supplied values are kept apart so that
/// either can be presented on its own, or merged into the computed values
/// the release actually runs with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRelease {
    /// Release name
    pub name: String,

    /// Kubernetes namespace
    pub namespace: String,

    /// Revision number (1-indexed, increments with each upgrade)
    pub version: u32,

    /// Current state with timing information
    pub state: ReleaseState,

    /// Pack metadata at deploy time
    pub pack: PackMetadata,

    /// Default values shipped with the pack
    #[serde(default)]
    pub pack_values: Values,

    /// User-supplied values (overrides on top of the pack defaults)
    #[serde(default)]
    pub values: Values,

    /// Custom labels for filtering/querying
    #[serde(default)]
    pub labels: HashMap<String, String>,

    /// Description of this revision
    #[serde(default)]
    pub description: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Notes shown after install/upgrade (if present)
    #[serde(default)]
    pub notes: Option<String>,
}

impl StoredRelease {
    /// Create a new release for installation
    pub fn for_install(
        name: String,
        namespace: String,
        pack: PackMetadata,
        pack_values: Values,
        values: Values,
    ) -> Self {
        let now = Utc::now();
        Self {
            name,
            namespace,
            version: 1,
            state: ReleaseState::PendingInstall {
                started_at: now,
                timeout: DEFAULT_OPERATION_TIMEOUT,
            },
            pack,
            pack_values,
            values,
            labels: HashMap::new(),
            description: None,
            created_at: now,
            updated_at: now,
            notes: None,
        }
    }

    /// Create the next revision with new user-supplied values
    ///
    /// Pack, pack defaults, labels and notes carry over.
    pub fn for_upgrade(previous: &StoredRelease, values: Values, timeout: Duration) -> Self {
        let now = Utc::now();
        Self {
            name: previous.name.clone(),
            namespace: previous.namespace.clone(),
            version: previous.version + 1,
            state: ReleaseState::PendingUpgrade {
                started_at: now,
                timeout,
                previous_version: previous.version,
            },
            pack: previous.pack.clone(),
            pack_values: previous.pack_values.clone(),
            values,
            labels: previous.labels.clone(),
            description: None,
            created_at: now,
            updated_at: now,
            notes: previous.notes.clone(),
        }
    }

    /// Pack defaults with the user-supplied values merged on top
    pub fn computed_values(&self) -> Values {
        Values::merged(&self.pack_values, &self.values)
    }

    /// Storage key for this release
    pub fn storage_key(&self) -> String {
        storage_key(&self.name, self.version)
    }

    /// Check if this release is stuck (pending operation timed out)
    pub fn is_stuck(&self) -> bool {
        self.state.is_stale()
    }

    /// Mark the release as deployed
    pub fn mark_deployed(&mut self) {
        self.state = ReleaseState::Deployed;
        self.updated_at = Utc::now();
    }

    /// Mark the release as failed
    pub fn mark_failed(&mut self, reason: String) {
        self.state = ReleaseState::Failed {
            reason,
            failed_at: Utc::now(),
        };
        self.updated_at = Utc::now();
    }

    /// Mark the release as superseded (replaced by a newer version)
    pub fn mark_superseded(&mut self) {
        self.state = ReleaseState::Superseded;
        self.updated_at = Utc::now();
    }
}

/// Storage key for a release revision
pub fn storage_key(name: &str, version: u32) -> String {
    format!("sh.reledit.release.v1.{}.v{}", name, version)
}

/// Release state with timing information for pending operations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ReleaseState {
    /// Successfully deployed
    Deployed,

    /// Deployment failed
    Failed {
        reason: String,
        failed_at: DateTime<Utc>,
    },

    /// Replaced by a newer revision
    Superseded,

    /// Installation in progress
    PendingInstall {
        started_at: DateTime<Utc>,
        #[serde(with = "duration_serde")]
        timeout: Duration,
    },

    /// Upgrade in progress
    PendingUpgrade {
        started_at: DateTime<Utc>,
        #[serde(with = "duration_serde")]
        timeout: Duration,
        previous_version: u32,
    },
}

impl ReleaseState {
    /// Check if this is a pending (transitional) state
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Self::PendingInstall { .. } | Self::PendingUpgrade { .. }
        )
    }

    /// Check if this pending state has timed out (is stale)
    pub fn is_stale(&self) -> bool {
        match self.elapsed_and_timeout() {
            Some((elapsed, timeout)) => elapsed > timeout,
            None => false,
        }
    }

    /// Get elapsed time since operation started (for pending states)
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed_and_timeout().map(|(elapsed, _)| elapsed)
    }

    fn elapsed_and_timeout(&self) -> Option<(Duration, Duration)> {
        match self {
            Self::PendingInstall { started_at, timeout }
            | Self::PendingUpgrade {
                started_at,
                timeout,
                ..
            } => Some((Utc::now().signed_duration_since(*started_at), *timeout)),
            _ => None,
        }
    }

    /// Human-readable status name
    pub fn status_name(&self) -> &'static str {
        match self {
            Self::Deployed => "deployed",
            Self::Failed { .. } => "failed",
            Self::Superseded => "superseded",
            Self::PendingInstall { .. } => "pending-install",
            Self::PendingUpgrade { .. } => "pending-upgrade",
        }
    }
}

impl std::fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed { reason, .. } => write!(f, "failed: {}", reason),
            other => write!(f, "{}", other.status_name()),
        }
    }
}

impl Default for ReleaseState {
    fn default() -> Self {
        Self::Deployed
    }
}

/// Serialization helper for chrono::Duration
mod duration_serde {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.num_seconds().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = i64::deserialize(deserializer)?;
        Ok(Duration::seconds(seconds))
    }
}
