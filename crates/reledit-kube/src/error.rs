//! Error types for reledit-kube

use thiserror::Error;

/// Result type for reledit-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while reading or recording releases
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Release not found
    #[error("release '{name}' not found in namespace '{namespace}'")]
    ReleaseNotFound { name: String, namespace: String },

    /// Release exists but the requested revision does not
    #[error("revision {revision} of release '{name}' not found in namespace '{namespace}'")]
    RevisionNotFound {
        name: String,
        namespace: String,
        revision: u32,
    },

    /// Release already exists
    #[error("release '{name}' already exists in namespace '{namespace}'")]
    ReleaseAlreadyExists { name: String, namespace: String },

    /// Another operation is in progress
    #[error("another operation is in progress for release '{name}': {status}")]
    OperationInProgress { name: String, status: String },

    /// Release is in a stuck state
    #[error("release '{name}' is stuck in state '{status}' (started {elapsed} ago)")]
    StuckRelease {
        name: String,
        status: String,
        elapsed: String,
    },

    /// A newer revision was recorded after the one being upgraded was read
    #[error("release '{name}' changed while it was being edited (expected revision {expected}, found {found})")]
    ReleaseChanged {
        name: String,
        expected: u32,
        found: u32,
    },

    /// Upgrade did not reach the deployed state
    #[error("upgrade of release '{name}' did not complete: {message}")]
    UpgradeFailed { name: String, message: String },

    /// Storage error
    #[error("storage error: {0}")]
    Storage(String),

    /// Release data too large
    #[error("release data too large ({size} bytes, max {max} bytes)")]
    ReleaseTooLarge { size: usize, max: usize },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Compression error
    #[error("compression error: {0}")]
    Compression(String),

    /// Values document error
    #[error("values error: {0}")]
    Values(#[from] reledit_core::CoreError),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Timeout
    #[error("operation timed out after {0}")]
    Timeout(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for KubeError {
    fn from(e: serde_yaml::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl KubeError {
    /// Unknown release or unknown revision
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            KubeError::ReleaseNotFound { .. } | KubeError::RevisionNotFound { .. }
        )
    }

    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_api_not_found(&self) -> bool {
        matches!(self, KubeError::Api(kube::Error::Api(resp)) if resp.code == 404)
    }

    /// Check if this is a conflict error (409)
    pub fn is_conflict(&self) -> bool {
        matches!(self, KubeError::Api(kube::Error::Api(resp)) if resp.code == 409)
    }
}
