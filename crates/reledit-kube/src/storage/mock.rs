//! Mock storage driver for testing
//!
//! This driver stores releases in memory, useful for unit tests
//! without requiring a Kubernetes cluster.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::StorageDriver;
use crate::error::{KubeError, Result};
use crate::release::StoredRelease;

type Store = HashMap<String, HashMap<String, HashMap<u32, StoredRelease>>>;

/// In-memory storage driver for testing
#[derive(Clone, Default)]
pub struct MockStorageDriver {
    /// Storage: namespace -> name -> version -> release
    store: Arc<RwLock<Store>>,
    /// Track operation counts for assertions
    operations: Arc<RwLock<OperationCounts>>,
    /// When set, create/update fail with a storage error
    fail_writes: Arc<AtomicBool>,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: usize,
    pub lists: usize,
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl OperationCounts {
    /// Total number of mutating operations
    pub fn writes(&self) -> usize {
        self.creates + self.updates + self.deletes
    }
}

impl MockStorageDriver {
    /// Create a new empty mock driver
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-populated releases
    pub fn with_releases(releases: Vec<StoredRelease>) -> Self {
        let driver = Self::new();
        {
            let mut store = driver.write_store();
            for release in releases {
                store
                    .entry(release.namespace.clone())
                    .or_default()
                    .entry(release.name.clone())
                    .or_default()
                    .insert(release.version, release);
            }
        }
        driver
    }

    /// Make every subsequent create/update fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        *self.counts() = OperationCounts::default();
    }

    /// Count total releases
    pub fn release_count(&self) -> usize {
        self.read_store()
            .values()
            .flat_map(|ns| ns.values())
            .map(|name| name.len())
            .sum()
    }

    fn read_store(&self) -> RwLockReadGuard<'_, Store> {
        self.store
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, Store> {
        self.store
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn counts(&self) -> RwLockWriteGuard<'_, OperationCounts> {
        self.operations
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KubeError::Storage("mock storage is read-only".to_string()));
        }
        Ok(())
    }
}

fn not_found(namespace: &str, name: &str) -> KubeError {
    KubeError::ReleaseNotFound {
        name: name.to_string(),
        namespace: namespace.to_string(),
    }
}

#[async_trait]
impl StorageDriver for MockStorageDriver {
    async fn get(&self, namespace: &str, name: &str, version: u32) -> Result<StoredRelease> {
        self.counts().gets += 1;

        self.read_store()
            .get(namespace)
            .and_then(|ns| ns.get(name))
            .and_then(|versions| versions.get(&version))
            .cloned()
            .ok_or_else(|| not_found(namespace, name))
    }

    async fn get_latest(&self, namespace: &str, name: &str) -> Result<StoredRelease> {
        self.counts().gets += 1;

        self.read_store()
            .get(namespace)
            .and_then(|ns| ns.get(name))
            .and_then(|versions| versions.values().max_by_key(|r| r.version))
            .cloned()
            .ok_or_else(|| not_found(namespace, name))
    }

    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<StoredRelease>> {
        self.counts().lists += 1;

        let mut releases: Vec<StoredRelease> = self
            .read_store()
            .get(namespace)
            .and_then(|ns| ns.get(name))
            .map(|versions| versions.values().cloned().collect())
            .unwrap_or_default();

        if releases.is_empty() {
            return Err(not_found(namespace, name));
        }

        // Sort by version descending
        releases.sort_by(|a, b| b.version.cmp(&a.version));

        Ok(releases)
    }

    async fn create(&self, release: &StoredRelease) -> Result<()> {
        self.counts().creates += 1;
        self.check_writable()?;

        let mut store = self.write_store();
        let versions = store
            .entry(release.namespace.clone())
            .or_default()
            .entry(release.name.clone())
            .or_default();

        if versions.contains_key(&release.version) {
            return Err(KubeError::ReleaseAlreadyExists {
                name: release.name.clone(),
                namespace: release.namespace.clone(),
            });
        }

        versions.insert(release.version, release.clone());
        Ok(())
    }

    async fn update(&self, release: &StoredRelease) -> Result<()> {
        self.counts().updates += 1;
        self.check_writable()?;

        self.write_store()
            .entry(release.namespace.clone())
            .or_default()
            .entry(release.name.clone())
            .or_default()
            .insert(release.version, release.clone());
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str, version: u32) -> Result<StoredRelease> {
        self.counts().deletes += 1;

        self.write_store()
            .get_mut(namespace)
            .and_then(|ns| ns.get_mut(name))
            .and_then(|versions| versions.remove(&version))
            .ok_or_else(|| not_found(namespace, name))
    }
}
