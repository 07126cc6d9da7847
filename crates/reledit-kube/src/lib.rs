//! reledit Kube - release storage and upgrades
//!
//! This crate provides:
//! - **Storage Drivers**: Persist release revisions in Kubernetes Secrets or locally
//! - **Release Model**: Stored revisions with pack defaults and user-supplied values kept apart
//! - **Values Retrieval**: User-supplied or computed values of any revision
//! - **Upgrades**: Record a new revision from edited values
//! - **Values Diff**: Key-path and line diff between two values documents

pub mod actions;
pub mod diff;
pub mod error;
pub mod release;
pub mod storage;
pub mod upgrade;
pub mod values;

pub use actions::UpgradeOptions;
pub use diff::{ChangeType, DiffContent, ValueChange, ValuesDiff};
pub use error::{KubeError, Result};
pub use release::{ReleaseState, StoredRelease};
pub use storage::{
    CompressionMethod, FileDriver, MockStorageDriver, OperationCounts, SecretsDriver,
    StorageConfig, StorageDriver,
};
pub use upgrade::{ReleaseUpgrader, UpgradeExecutor};
pub use values::{ValueScope, ValuesQuery, get_release, resolve_values};
