//! Retrieval of the values document a release runs with

use reledit_core::Values;

use crate::error::{KubeError, Result};
use crate::release::StoredRelease;
use crate::storage::StorageDriver;

/// Which values of a release to retrieve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueScope {
    /// Only the values supplied by the user, unmerged
    #[default]
    UserSupplied,

    /// Pack defaults with the user-supplied values merged on top
    Computed,
}

impl ValueScope {
    /// Scope for an `--all` style flag
    pub fn from_all_flag(all: bool) -> Self {
        if all { Self::Computed } else { Self::UserSupplied }
    }
}

/// Selects the values to retrieve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValuesQuery {
    pub scope: ValueScope,

    /// Revision to read; 0 means the latest
    pub revision: u32,
}

impl ValuesQuery {
    pub fn new(scope: ValueScope, revision: u32) -> Self {
        Self { scope, revision }
    }
}

/// Fetch a release revision
///
/// A `revision` of 0 selects the latest. An unknown release yields
/// [`KubeError::ReleaseNotFound`], a known release without the requested
/// revision yields [`KubeError::RevisionNotFound`].
pub async fn get_release<S>(
    storage: &S,
    namespace: &str,
    name: &str,
    revision: u32,
) -> Result<StoredRelease>
where
    S: StorageDriver + ?Sized,
{
    if revision == 0 {
        return storage.get_latest(namespace, name).await;
    }

    match storage.get(namespace, name, revision).await {
        Err(KubeError::ReleaseNotFound { .. }) if storage.exists(namespace, name).await? => {
            Err(KubeError::RevisionNotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
                revision,
            })
        }
        other => other,
    }
}

/// Retrieve the values document of a release
pub async fn resolve_values<S>(
    storage: &S,
    namespace: &str,
    name: &str,
    query: &ValuesQuery,
) -> Result<Values>
where
    S: StorageDriver + ?Sized,
{
    let release = get_release(storage, namespace, name, query.revision).await?;
    tracing::debug!(
        release = name,
        revision = release.version,
        scope = ?query.scope,
        "resolved release values"
    );

    Ok(match query.scope {
        ValueScope::UserSupplied => release.values,
        ValueScope::Computed => release.computed_values(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::tests::test_release;
    use crate::storage::MockStorageDriver;
    use serde_json::json;

    fn storage_with_history() -> MockStorageDriver {
        let mut v1 = test_release("web", "default", 1);
        v1.values = Values(json!({"replicas": 2}));
        v1.mark_superseded();

        let mut v2 = test_release("web", "default", 2);
        v2.values = Values(json!({"replicas": 4, "image": {"tag": "1.26"}}));

        MockStorageDriver::with_releases(vec![v1, v2])
    }

    #[tokio::test]
    async fn test_user_supplied_latest() {
        let storage = storage_with_history();
        let values = resolve_values(&storage, "default", "web", &ValuesQuery::default())
            .await
            .unwrap();

        assert_eq!(values, Values(json!({"replicas": 4, "image": {"tag": "1.26"}})));
    }

    #[tokio::test]
    async fn test_computed_latest_merges_defaults() {
        let storage = storage_with_history();
        let query = ValuesQuery::new(ValueScope::Computed, 0);
        let values = resolve_values(&storage, "default", "web", &query)
            .await
            .unwrap();

        assert_eq!(
            values,
            Values(json!({"replicas": 4, "image": {"repository": "nginx", "tag": "1.26"}}))
        );
    }

    #[tokio::test]
    async fn test_historical_revision() {
        let storage = storage_with_history();
        let query = ValuesQuery::new(ValueScope::UserSupplied, 1);
        let values = resolve_values(&storage, "default", "web", &query)
            .await
            .unwrap();

        assert_eq!(values, Values(json!({"replicas": 2})));
    }

    #[tokio::test]
    async fn test_unknown_release() {
        let storage = storage_with_history();
        let err = resolve_values(&storage, "default", "ghost", &ValuesQuery::default())
            .await
            .unwrap_err();

        assert!(matches!(err, KubeError::ReleaseNotFound { .. }));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unknown_revision_of_known_release() {
        let storage = storage_with_history();
        let err = get_release(&storage, "default", "web", 9).await.unwrap_err();

        assert!(matches!(err, KubeError::RevisionNotFound { revision: 9, .. }));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unknown_revision_of_unknown_release() {
        let storage = storage_with_history();
        let err = get_release(&storage, "default", "ghost", 3).await.unwrap_err();

        assert!(matches!(err, KubeError::ReleaseNotFound { .. }));
    }

    #[tokio::test]
    async fn test_resolve_is_read_only() {
        let storage = storage_with_history();
        let query = ValuesQuery::new(ValueScope::Computed, 1);
        let _ = resolve_values(&storage, "default", "web", &query).await.unwrap();

        assert_eq!(storage.operation_counts().writes(), 0);
    }

    #[test]
    fn test_scope_from_flag() {
        assert_eq!(ValueScope::from_all_flag(true), ValueScope::Computed);
        assert_eq!(ValueScope::from_all_flag(false), ValueScope::UserSupplied);
    }
}
