//! User configuration
//!
//! Read from `~/.config/reledit/config.yaml` unless another file is given.
//! Command-line flags and environment variables take precedence over it.
//!
//! ```yaml
//! editor: code --wait
//! namespace: staging
//! timeout: 5m
//! maxHistory: 10
//! storage:
//!   driver: secrets
//!   compression: zstd
//! ```

use clap::ValueEnum;
use reledit_kube::{CompressionMethod, StorageConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CliError, Result};

/// Configuration file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Editor command line, `$VAR` references allowed
    #[serde(default)]
    pub editor: Option<String>,

    /// Namespace used when `--namespace` is not given
    #[serde(default)]
    pub namespace: Option<String>,

    /// Bound on the upgrade step
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    /// Revisions kept per release after an upgrade
    #[serde(default)]
    pub max_history: Option<u32>,

    /// Release store settings
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Where releases are read from and recorded to
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSettings {
    #[serde(default)]
    pub driver: StorageKind,

    /// Directory of the file driver
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// `none`, `gzip` or `zstd`
    #[serde(default)]
    pub compression: Option<String>,
}

/// Release store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Kubernetes Secrets in the release namespace
    Secrets,

    /// Local directory
    #[default]
    File,
}

impl Config {
    /// Load configuration from `path`, or from the default location
    ///
    /// An explicit path must exist; a missing default file yields the
    /// default configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content)
            .map_err(|e| CliError::config(format!("invalid {}: {}", path.display(), e)))
    }

    /// Get default configuration path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("reledit").join("config.yaml"))
    }

    /// Storage configuration for the drivers
    pub fn storage_config(&self) -> Result<StorageConfig> {
        let mut config = StorageConfig::default();
        if let Some(compression) = &self.storage.compression {
            config.compression = compression
                .parse::<CompressionMethod>()
                .map_err(|e| CliError::config(e.to_string()))?;
        }
        Ok(config)
    }
}

/// Default directory of the file driver
pub fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reledit")
        .join("releases")
}
