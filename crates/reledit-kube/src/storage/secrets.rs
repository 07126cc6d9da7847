//! Kubernetes Secrets storage driver
//!
//! Each revision is one Secret named after [`storage_key`], labelled with the
//! release identity and the compression used for its payload.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Client;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use std::collections::BTreeMap;

use super::{
    CompressionMethod, MAX_RESOURCE_SIZE, StorageConfig, StorageDriver, decode_from_storage,
    encode_for_storage, storage_labels,
};
use crate::error::{KubeError, Result};
use crate::release::{StoredRelease, storage_key};

const SECRET_TYPE: &str = "reledit.io/release.v1";
const COMPRESSION_LABEL: &str = "reledit.io/compression";

/// Kubernetes Secrets storage driver
pub struct SecretsDriver {
    client: Client,
    config: StorageConfig,
}

impl SecretsDriver {
    /// Create a new Secrets driver from the ambient kubeconfig
    pub async fn new(config: StorageConfig) -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self { client, config })
    }

    /// Create with an existing client
    pub fn with_client(client: Client, config: StorageConfig) -> Self {
        Self { client, config }
    }

    fn secrets_api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn encode(&self, release: &StoredRelease) -> Result<Secret> {
        let encoded = encode_for_storage(release, &self.config)?;
        if encoded.len() > MAX_RESOURCE_SIZE {
            return Err(KubeError::ReleaseTooLarge {
                size: encoded.len(),
                max: MAX_RESOURCE_SIZE,
            });
        }
        Ok(build_secret(release, &encoded, self.config.compression))
    }
}

/// Build the Secret holding one encoded revision
fn build_secret(release: &StoredRelease, encoded: &str, compression: CompressionMethod) -> Secret {
    let mut labels = storage_labels(release);
    labels.insert(
        "reledit.io/storage-driver".to_string(),
        "secrets".to_string(),
    );
    labels.insert(
        COMPRESSION_LABEL.to_string(),
        compression_label(compression).to_string(),
    );

    let mut data = BTreeMap::new();
    data.insert(
        "release".to_string(),
        k8s_openapi::ByteString(encoded.as_bytes().to_vec()),
    );

    Secret {
        metadata: ObjectMeta {
            name: Some(release.storage_key()),
            namespace: Some(release.namespace.clone()),
            labels: Some(labels),
            ..Default::default()
        },
        type_: Some(SECRET_TYPE.to_string()),
        data: Some(data),
        ..Default::default()
    }
}

fn compression_label(compression: CompressionMethod) -> &'static str {
    match compression {
        CompressionMethod::None => "none",
        CompressionMethod::Gzip { .. } => "gzip",
        CompressionMethod::Zstd { .. } => "zstd",
    }
}

/// Decode the release held in a Secret
///
/// The compression label wins over the configured default, so releases
/// written with another setting stay readable.
fn parse_secret(secret: &Secret, fallback: CompressionMethod) -> Result<StoredRelease> {
    let data = secret
        .data
        .as_ref()
        .and_then(|d| d.get("release"))
        .ok_or_else(|| KubeError::Storage("Secret missing 'release' data".to_string()))?;

    let encoded = std::str::from_utf8(&data.0)
        .map_err(|e| KubeError::Storage(format!("Invalid UTF-8 in secret: {}", e)))?;

    let compression = secret
        .metadata
        .labels
        .as_ref()
        .and_then(|l| l.get(COMPRESSION_LABEL))
        .and_then(|c| c.parse().ok())
        .unwrap_or(fallback);

    decode_from_storage(encoded, compression)
}

#[async_trait]
impl StorageDriver for SecretsDriver {
    async fn get(&self, namespace: &str, name: &str, version: u32) -> Result<StoredRelease> {
        let api = self.secrets_api(namespace);

        match api.get(&storage_key(name, version)).await {
            Ok(secret) => parse_secret(&secret, self.config.compression),
            Err(kube::Error::Api(e)) if e.code == 404 => Err(KubeError::ReleaseNotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_latest(&self, namespace: &str, name: &str) -> Result<StoredRelease> {
        let history = self.history(namespace, name).await?;
        history
            .into_iter()
            .next()
            .ok_or_else(|| KubeError::ReleaseNotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            })
    }

    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<StoredRelease>> {
        let label_selector = format!(
            "app.kubernetes.io/managed-by=reledit,reledit.io/release-name={}",
            name
        );
        let lp = ListParams::default().labels(&label_selector);

        let secrets = self.secrets_api(namespace).list(&lp).await?;

        let mut releases: Vec<StoredRelease> = Vec::new();
        for secret in &secrets.items {
            match parse_secret(secret, self.config.compression) {
                Ok(release) => releases.push(release),
                Err(e) => {
                    tracing::warn!(
                        secret = secret.metadata.name.as_deref().unwrap_or_default(),
                        error = %e,
                        "skipping unreadable release secret"
                    );
                }
            }
        }

        // Sort by version descending (newest first)
        releases.sort_by(|a, b| b.version.cmp(&a.version));

        if releases.is_empty() {
            return Err(KubeError::ReleaseNotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            });
        }

        Ok(releases)
    }

    async fn create(&self, release: &StoredRelease) -> Result<()> {
        let secret = self.encode(release)?;

        match self
            .secrets_api(&release.namespace)
            .create(&PostParams::default(), &secret)
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 409 => Err(KubeError::ReleaseAlreadyExists {
                name: release.name.clone(),
                namespace: release.namespace.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, release: &StoredRelease) -> Result<()> {
        let secret = self.encode(release)?;

        self.secrets_api(&release.namespace)
            .replace(&release.storage_key(), &PostParams::default(), &secret)
            .await?;

        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str, version: u32) -> Result<StoredRelease> {
        let release = self.get(namespace, name, version).await?;

        match self
            .secrets_api(namespace)
            .delete(&storage_key(name, version), &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(release),
            // Already deleted
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(release),
            Err(e) => Err(e.into()),
        }
    }
}
