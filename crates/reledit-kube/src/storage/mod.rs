//! Storage drivers for persisting release information
//!
//! Available backends:
//! - **Secrets**: Store releases in Kubernetes Secrets
//! - **File**: Store releases in local files
//! - **Mock**: In-memory store with operation counters, for tests
//!
//! Every backend stores the same payload: the release serialized to JSON,
//! compressed, then base64 encoded.

mod file;
mod mock;
mod secrets;

pub use file::FileDriver;
pub use mock::{MockStorageDriver, OperationCounts};
pub use secrets::SecretsDriver;

use crate::error::{KubeError, Result};
use crate::release::StoredRelease;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Maximum size for a single Kubernetes Secret (1MB - some overhead)
pub const MAX_RESOURCE_SIZE: usize = 1_000_000;

/// Storage driver trait for release persistence
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Get a specific release by name and version
    async fn get(&self, namespace: &str, name: &str, version: u32) -> Result<StoredRelease>;

    /// Get the latest release for a name
    async fn get_latest(&self, namespace: &str, name: &str) -> Result<StoredRelease>;

    /// Get release history (all versions for a name, newest first)
    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<StoredRelease>>;

    /// Create a new release
    async fn create(&self, release: &StoredRelease) -> Result<()>;

    /// Update an existing release
    async fn update(&self, release: &StoredRelease) -> Result<()>;

    /// Delete a specific release version
    async fn delete(&self, namespace: &str, name: &str, version: u32) -> Result<StoredRelease>;

    /// Check if a release exists
    async fn exists(&self, namespace: &str, name: &str) -> Result<bool> {
        match self.get_latest(namespace, name).await {
            Ok(_) => Ok(true),
            Err(KubeError::ReleaseNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<T: StorageDriver + ?Sized> StorageDriver for std::sync::Arc<T> {
    async fn get(&self, namespace: &str, name: &str, version: u32) -> Result<StoredRelease> {
        (**self).get(namespace, name, version).await
    }

    async fn get_latest(&self, namespace: &str, name: &str) -> Result<StoredRelease> {
        (**self).get_latest(namespace, name).await
    }

    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<StoredRelease>> {
        (**self).history(namespace, name).await
    }

    async fn create(&self, release: &StoredRelease) -> Result<()> {
        (**self).create(release).await
    }

    async fn update(&self, release: &StoredRelease) -> Result<()> {
        (**self).update(release).await
    }

    async fn delete(&self, namespace: &str, name: &str, version: u32) -> Result<StoredRelease> {
        (**self).delete(namespace, name, version).await
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Compression method
    pub compression: CompressionMethod,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            compression: CompressionMethod::Zstd { level: 3 },
        }
    }
}

/// Compression method for release data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum CompressionMethod {
    /// No compression
    None,

    /// Gzip compression
    Gzip { level: u32 },

    /// Zstd compression (better ratio, faster)
    Zstd { level: i32 },
}

impl Default for CompressionMethod {
    fn default() -> Self {
        Self::Zstd { level: 3 }
    }
}

impl std::str::FromStr for CompressionMethod {
    type Err = KubeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "gzip" => Ok(Self::Gzip { level: 6 }),
            "zstd" => Ok(Self::Zstd { level: 3 }),
            other => Err(KubeError::InvalidConfig(format!(
                "unknown compression method '{}' (expected none, gzip or zstd)",
                other
            ))),
        }
    }
}

/// Compress data using the configured method
#[must_use = "compression result should be used"]
pub fn compress(data: &[u8], method: CompressionMethod) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::None => Ok(data.to_vec()),
        CompressionMethod::Gzip { level } => {
            use std::io::Write;
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::new(level));
            encoder
                .write_all(data)
                .map_err(|e| KubeError::Compression(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| KubeError::Compression(e.to_string()))
        }
        CompressionMethod::Zstd { level } => zstd::encode_all(std::io::Cursor::new(data), level)
            .map_err(|e| KubeError::Compression(e.to_string())),
    }
}

/// Decompress data
#[must_use = "decompression result should be used"]
pub fn decompress(data: &[u8], method: CompressionMethod) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::None => Ok(data.to_vec()),
        CompressionMethod::Gzip { .. } => {
            use std::io::Read;
            let mut decoder = flate2::read::GzDecoder::new(data);
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| KubeError::Compression(e.to_string()))?;
            Ok(decompressed)
        }
        CompressionMethod::Zstd { .. } => zstd::decode_all(std::io::Cursor::new(data))
            .map_err(|e| KubeError::Compression(e.to_string())),
    }
}

/// Encode a release for storage (serialize + compress + base64)
#[must_use = "encoded data should be used for storage"]
pub fn encode_for_storage(release: &StoredRelease, config: &StorageConfig) -> Result<String> {
    let json = serde_json::to_vec(release)?;
    let compressed = compress(&json, config.compression)?;
    Ok(base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        &compressed,
    ))
}

/// Decode a release from storage (base64 + decompress + deserialize)
#[must_use = "decoded release should be used"]
pub fn decode_from_storage(data: &str, compression: CompressionMethod) -> Result<StoredRelease> {
    let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, data.trim())
        .map_err(|e| KubeError::Serialization(format!("base64 decode error: {}", e)))?;
    let decompressed = decompress(&decoded, compression)?;
    Ok(serde_json::from_slice(&decompressed)?)
}

/// Labels applied to all storage resources
#[must_use = "labels should be applied to resources"]
pub fn storage_labels(release: &StoredRelease) -> std::collections::BTreeMap<String, String> {
    let mut labels = std::collections::BTreeMap::new();
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        "reledit".to_string(),
    );
    labels.insert("reledit.io/release-name".to_string(), release.name.clone());
    labels.insert(
        "reledit.io/release-version".to_string(),
        release.version.to_string(),
    );
    labels.insert(
        "reledit.io/release-namespace".to_string(),
        release.namespace.clone(),
    );
    labels.insert(
        "reledit.io/release-status".to_string(),
        release.state.status_name().to_string(),
    );
    labels
}

/// Keep only the `max_history` newest revisions of a release
///
/// Returns the number of deleted revisions. The latest revision is never
/// deleted, even with a `max_history` of zero.
pub async fn prune_history<S>(storage: &S, namespace: &str, name: &str, max_history: u32) -> Result<usize>
where
    S: StorageDriver + ?Sized,
{
    let keep = max_history.max(1) as usize;
    let history = storage.history(namespace, name).await?;
    if history.len() <= keep {
        return Ok(0);
    }

    let excess = history.len() - keep;
    for release in history.iter().skip(keep) {
        storage.delete(namespace, name, release.version).await?;
    }
    tracing::debug!(release = name, deleted = excess, "pruned release history");
    Ok(excess)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ReleaseState;
    use crate::release::tests::test_release;

    #[test]
    fn test_compression_roundtrip_zstd() {
        let data = b"Hello, World! This is test data for compression.";
        let compressed = compress(data, CompressionMethod::Zstd { level: 3 }).unwrap();
        let decompressed = decompress(&compressed, CompressionMethod::Zstd { level: 3 }).unwrap();
        assert_eq!(data.as_slice(), decompressed.as_slice());
    }

    #[test]
    fn test_compression_roundtrip_gzip() {
        let data = b"Hello, World! This is test data for compression.";
        let compressed = compress(data, CompressionMethod::Gzip { level: 6 }).unwrap();
        let decompressed = decompress(&compressed, CompressionMethod::Gzip { level: 6 }).unwrap();
        assert_eq!(data.as_slice(), decompressed.as_slice());
    }

    #[test]
    fn test_encode_decode_keeps_values_apart() {
        let release = test_release("web", "default", 2);
        let config = StorageConfig::default();

        let encoded = encode_for_storage(&release, &config).unwrap();
        let decoded = decode_from_storage(&encoded, config.compression).unwrap();

        assert_eq!(decoded.name, "web");
        assert_eq!(decoded.version, 2);
        assert_eq!(decoded.values, release.values);
        assert_eq!(decoded.pack_values, release.pack_values);
    }

    #[test]
    fn test_compression_from_str() {
        assert_eq!("none".parse::<CompressionMethod>().unwrap(), CompressionMethod::None);
        assert_eq!(
            "gzip".parse::<CompressionMethod>().unwrap(),
            CompressionMethod::Gzip { level: 6 }
        );
        assert!("brotli".parse::<CompressionMethod>().is_err());
    }

    #[test]
    fn test_storage_labels() {
        let release = test_release("test", "default", 1);
        let labels = storage_labels(&release);

        assert_eq!(
            labels.get("app.kubernetes.io/managed-by"),
            Some(&"reledit".to_string())
        );
        assert_eq!(labels.get("reledit.io/release-name"), Some(&"test".to_string()));
        assert_eq!(labels.get("reledit.io/release-version"), Some(&"1".to_string()));
        assert_eq!(
            labels.get("reledit.io/release-status"),
            Some(&"deployed".to_string())
        );
    }

    #[test]
    fn test_decode_invalid_base64() {
        let result = decode_from_storage("not valid base64!!!", CompressionMethod::None);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_invalid_json() {
        let invalid = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b"not json");
        let result = decode_from_storage(&invalid, CompressionMethod::None);
        assert!(matches!(result, Err(KubeError::Serialization(_))));
    }

    #[test]
    fn test_release_state_preserved() {
        let mut release = test_release("test", "default", 1);
        release.mark_failed("Test failure".to_string());

        let encoded = encode_for_storage(&release, &StorageConfig::default()).unwrap();
        let decoded = decode_from_storage(&encoded, CompressionMethod::default()).unwrap();

        assert!(matches!(decoded.state, ReleaseState::Failed { reason, .. } if reason == "Test failure"));
    }

    #[tokio::test]
    async fn test_prune_history_keeps_newest() {
        let storage = MockStorageDriver::new();
        for version in 1..=5 {
            storage
                .create(&test_release("web", "default", version))
                .await
                .unwrap();
        }

        let deleted = prune_history(&storage, "default", "web", 2).await.unwrap();
        assert_eq!(deleted, 3);

        let versions: Vec<u32> = storage
            .history("default", "web")
            .await
            .unwrap()
            .iter()
            .map(|r| r.version)
            .collect();
        assert_eq!(versions, vec![5, 4]);
    }

    #[tokio::test]
    async fn test_prune_history_never_drops_latest() {
        let storage = MockStorageDriver::new();
        storage
            .create(&test_release("web", "default", 1))
            .await
            .unwrap();

        let deleted = prune_history(&storage, "default", "web", 0).await.unwrap();
        assert_eq!(deleted, 0);
        assert!(storage.exists("default", "web").await.unwrap());
    }
}
