//! CLI commands

pub mod edit;
pub mod get_values;

use std::path::Path;
use std::sync::Arc;

use reledit_kube::{FileDriver, SecretsDriver, StorageDriver};

use crate::config::{Config, StorageKind, default_storage_dir};
use crate::error::{CliError, Result};

/// Open the release store selected by flags and configuration
pub async fn open_storage(
    kind: Option<StorageKind>,
    dir: Option<&Path>,
    config: &Config,
) -> Result<Arc<dyn StorageDriver>> {
    let storage_config = config.storage_config()?;

    match kind.unwrap_or(config.storage.driver) {
        StorageKind::Secrets => {
            let driver = SecretsDriver::new(storage_config).await.map_err(|e| {
                CliError::config(format!("cannot connect to the cluster: {}", e))
            })?;
            Ok(Arc::new(driver))
        }
        StorageKind::File => {
            let base_dir = dir
                .map(Path::to_path_buf)
                .or_else(|| config.storage.path.clone())
                .unwrap_or_else(default_storage_dir);
            tracing::debug!(path = %base_dir.display(), "using file release store");
            Ok(Arc::new(FileDriver::new(base_dir, storage_config)?))
        }
    }
}
