//! File-based storage driver
//!
//! Stores release data in local files. Useful for:
//! - Working without a Kubernetes cluster
//! - Integration tests

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{StorageConfig, StorageDriver, decode_from_storage, encode_for_storage};
use crate::error::{KubeError, Result};
use crate::release::StoredRelease;

/// File-based storage driver
///
/// Layout: `<base_dir>/<namespace>/<name>/v<version>.release`, each file
/// holding the encoded release.
#[derive(Debug, Clone)]
pub struct FileDriver {
    /// Base directory for storing releases
    base_dir: PathBuf,
    config: StorageConfig,
}

impl FileDriver {
    /// Create a new file driver
    pub fn new(base_dir: PathBuf, config: StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir, config })
    }

    /// Base directory of this driver
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn release_path(&self, namespace: &str, name: &str, version: u32) -> PathBuf {
        self.release_dir(namespace, name)
            .join(format!("v{}.release", version))
    }

    fn release_dir(&self, namespace: &str, name: &str) -> PathBuf {
        self.base_dir.join(namespace).join(name)
    }

    fn write_release(&self, release: &StoredRelease) -> Result<()> {
        let path = self.release_path(&release.namespace, &release.name, release.version);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let encoded = encode_for_storage(release, &self.config)?;
        std::fs::write(&path, encoded)?;

        Ok(())
    }

    fn read_release(&self, path: &Path) -> Result<StoredRelease> {
        let data = std::fs::read_to_string(path)?;
        decode_from_storage(&data, self.config.compression)
    }

    fn not_found(namespace: &str, name: &str) -> KubeError {
        KubeError::ReleaseNotFound {
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }
}

#[async_trait]
impl StorageDriver for FileDriver {
    async fn get(&self, namespace: &str, name: &str, version: u32) -> Result<StoredRelease> {
        let path = self.release_path(namespace, name, version);

        if !path.exists() {
            return Err(Self::not_found(namespace, name));
        }

        self.read_release(&path)
    }

    async fn get_latest(&self, namespace: &str, name: &str) -> Result<StoredRelease> {
        let history = self.history(namespace, name).await?;
        history
            .into_iter()
            .next()
            .ok_or_else(|| Self::not_found(namespace, name))
    }

    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<StoredRelease>> {
        let dir = self.release_dir(namespace, name);

        if !dir.exists() {
            return Err(Self::not_found(namespace, name));
        }

        let mut releases = Vec::new();
        for entry in std::fs::read_dir(&dir)?.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "release") {
                continue;
            }
            match self.read_release(&path) {
                Ok(release) => releases.push(release),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable release file");
                }
            }
        }

        if releases.is_empty() {
            return Err(Self::not_found(namespace, name));
        }

        // Sort by version descending
        releases.sort_by(|a, b| b.version.cmp(&a.version));

        Ok(releases)
    }

    async fn create(&self, release: &StoredRelease) -> Result<()> {
        let path = self.release_path(&release.namespace, &release.name, release.version);

        if path.exists() {
            return Err(KubeError::ReleaseAlreadyExists {
                name: release.name.clone(),
                namespace: release.namespace.clone(),
            });
        }

        self.write_release(release)
    }

    async fn update(&self, release: &StoredRelease) -> Result<()> {
        self.write_release(release)
    }

    async fn delete(&self, namespace: &str, name: &str, version: u32) -> Result<StoredRelease> {
        let path = self.release_path(namespace, name, version);
        let release = self.get(namespace, name, version).await?;

        std::fs::remove_file(&path)?;

        // Clean up empty directories
        let name_dir = self.release_dir(namespace, name);
        if name_dir.exists() && std::fs::read_dir(&name_dir)?.next().is_none() {
            let _ = std::fs::remove_dir(&name_dir);
        }

        Ok(release)
    }
}
