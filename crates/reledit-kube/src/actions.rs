//! Options for the upgrade operation

use std::collections::HashMap;
use std::time::Duration;

/// Default bound on an upgrade (5 minutes)
pub const DEFAULT_UPGRADE_TIMEOUT: Duration = Duration::from_secs(300);

/// Options for upgrade operation
#[derive(Debug, Clone)]
pub struct UpgradeOptions {
    /// Confirm the new revision is observed as deployed before returning
    pub wait: bool,

    /// Bound on the whole operation
    pub timeout: Duration,

    /// Maximum history to keep
    pub max_history: Option<u32>,

    /// Custom labels to add
    pub labels: HashMap<String, String>,

    /// Description for this revision
    pub description: Option<String>,
}

impl Default for UpgradeOptions {
    fn default() -> Self {
        Self {
            wait: false,
            timeout: DEFAULT_UPGRADE_TIMEOUT,
            max_history: None,
            labels: HashMap::new(),
            description: None,
        }
    }
}

impl UpgradeOptions {
    /// Create default upgrade options
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable waiting for the deployed state
    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    /// Bound the operation
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Prune history beyond this many revisions
    pub fn with_max_history(mut self, max_history: u32) -> Self {
        self.max_history = Some(max_history);
        self
    }

    /// Describe the new revision
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a label to the new revision
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}
