//! Edit command - edit the values of a release, then upgrade it

use std::io::Write;
use std::time::Duration;

use console::style;
use reledit_core::{OverrideMode, has_changed, parse_document, reconcile, render_document};
use reledit_kube::actions::DEFAULT_UPGRADE_TIMEOUT;
use reledit_kube::{
    ReleaseUpgrader, StorageDriver, StoredRelease, UpgradeExecutor, UpgradeOptions, ValueScope,
    ValuesDiff, ValuesQuery, get_release, resolve_values,
};

use crate::display::{display_values_diff, pluralize};
use crate::editor::DocumentEditor;
use crate::error::{CliError, Result};

/// How the values are presented and how the result is applied
#[derive(Debug, Clone)]
pub struct EditOptions {
    /// Present computed values instead of the user-supplied ones
    pub all_values: bool,

    /// Revision whose values are presented (0 = latest)
    pub revision: u32,

    /// Keep values that equal the pack defaults
    pub disable_default_subtraction: bool,

    /// Confirm the upgraded revision is deployed
    pub wait: bool,

    /// Bound on the upgrade
    pub timeout: Duration,

    /// Print the override diff before upgrading
    pub show_diff: bool,

    /// Revisions kept after the upgrade
    pub max_history: Option<u32>,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            all_values: false,
            revision: 0,
            disable_default_subtraction: false,
            wait: false,
            timeout: DEFAULT_UPGRADE_TIMEOUT,
            show_diff: false,
            max_history: None,
        }
    }
}

/// Result of an edit session
#[derive(Debug)]
pub enum EditOutcome {
    /// The document came back byte-identical, nothing was applied
    NoChange,

    /// A new revision was recorded
    Upgraded {
        release: Box<StoredRelease>,
        diff: ValuesDiff,
    },
}

/// Present a release's values in an editor and upgrade with the result
pub struct EditWorkflow<S, E, U> {
    storage: S,
    editor: E,
    upgrader: U,
}

impl<S, E, U> EditWorkflow<S, E, U>
where
    S: StorageDriver,
    E: DocumentEditor,
    U: UpgradeExecutor,
{
    pub fn new(storage: S, editor: E, upgrader: U) -> Self {
        Self {
            storage,
            editor,
            upgrader,
        }
    }

    /// Run one edit session for `name` in `namespace`
    pub async fn run(&self, name: &str, namespace: &str, options: &EditOptions) -> Result<EditOutcome> {
        // Pack defaults and the revision to upgrade always come from the latest
        let release = get_release(&self.storage, namespace, name, 0).await?;

        let query = ValuesQuery::new(ValueScope::from_all_flag(options.all_values), options.revision);
        let values = resolve_values(&self.storage, namespace, name, &query).await?;
        let presented = render_document(&values)?;

        let mut document = tempfile::Builder::new()
            .prefix(&format!("reledit-{}-", name))
            .suffix(".yaml")
            .tempfile()?;
        document.write_all(presented.as_bytes())?;
        document.flush()?;
        tracing::debug!(path = %document.path().display(), "wrote values document");

        self.editor.edit(document.path())?;

        let edited_text = std::fs::read_to_string(document.path())?;
        if !has_changed(&presented, &edited_text) {
            tracing::debug!(release = name, "values document unchanged");
            return Ok(EditOutcome::NoChange);
        }

        let edited = parse_document(&edited_text)?;
        let mode = OverrideMode::from_disable_flag(options.disable_default_subtraction);
        let overrides = reconcile(&edited, &release.pack_values, mode);

        let diff = ValuesDiff::between(&release.values, &overrides)?;
        if options.show_diff {
            display_values_diff(&diff);
        }

        let mut upgrade_options = UpgradeOptions::new()
            .with_wait(options.wait)
            .with_timeout(options.timeout)
            .with_description(format!("Edited values of revision {}", presented_revision(&release, options)));
        upgrade_options.max_history = options.max_history;

        let upgraded = self
            .upgrader
            .upgrade(&release, overrides, &upgrade_options)
            .await
            .map_err(CliError::upgrade)?;

        Ok(EditOutcome::Upgraded {
            release: Box::new(upgraded),
            diff,
        })
    }
}

fn presented_revision(latest: &StoredRelease, options: &EditOptions) -> u32 {
    if options.revision == 0 {
        latest.version
    } else {
        options.revision
    }
}

/// Run the edit command
pub async fn run<S, E>(
    name: &str,
    namespace: &str,
    storage: S,
    editor: E,
    options: &EditOptions,
) -> Result<()>
where
    S: StorageDriver + Clone,
    E: DocumentEditor,
{
    let upgrader = ReleaseUpgrader::new(storage.clone());
    let workflow = EditWorkflow::new(storage, editor, upgrader);

    match workflow.run(name, namespace, options).await? {
        EditOutcome::NoChange => {
            println!("Edit cancelled, no changes made!");
        }
        EditOutcome::Upgraded { release, diff } => {
            println!(
                "{} Release \"{}\" has been edited (revision {})",
                style("✓").green().bold(),
                style(&release.name).cyan(),
                style(release.version).yellow()
            );
            println!("  {}", style(format!("pack {}", release.pack.display_name())).dim());
            if diff.has_changes() {
                println!(
                    "  {}",
                    style(format!(
                        "{} changed in the user-supplied values",
                        pluralize(diff.changes.len(), "key", "keys")
                    ))
                    .dim()
                );
            }

            if let Some(notes) = &release.notes {
                println!("\n{}", style("NOTES:").bold());
                println!("{}", notes);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reledit_core::{PackMetadata, Values};
    use reledit_kube::{MockStorageDriver, ReleaseState};
    use serde_json::{Value as JsonValue, json};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Editor that runs a closure on the document and remembers its path
    struct ScriptedEditor<F> {
        script: F,
        seen: Mutex<Option<(PathBuf, String)>>,
    }

    impl<F> ScriptedEditor<F>
    where
        F: Fn(&Path) -> Result<()> + Send + Sync,
    {
        fn new(script: F) -> Self {
            Self {
                script,
                seen: Mutex::new(None),
            }
        }

        fn seen_path(&self) -> PathBuf {
            self.seen.lock().unwrap().clone().unwrap().0
        }

        fn presented(&self) -> String {
            self.seen.lock().unwrap().clone().unwrap().1
        }
    }

    impl<F> DocumentEditor for ScriptedEditor<F>
    where
        F: Fn(&Path) -> Result<()> + Send + Sync,
    {
        fn edit(&self, path: &Path) -> Result<()> {
            let presented = std::fs::read_to_string(path).unwrap();
            *self.seen.lock().unwrap() = Some((path.to_path_buf(), presented));
            (self.script)(path)
        }
    }

    fn writes(content: &'static str) -> ScriptedEditor<impl Fn(&Path) -> Result<()> + Send + Sync> {
        ScriptedEditor::new(move |path: &Path| {
            std::fs::write(path, content).unwrap();
            Ok(())
        })
    }

    fn untouched() -> ScriptedEditor<impl Fn(&Path) -> Result<()> + Send + Sync> {
        ScriptedEditor::new(|_: &Path| Ok(()))
    }

    fn release(defaults: JsonValue, values: JsonValue) -> StoredRelease {
        let mut release = StoredRelease::for_install(
            "web".to_string(),
            "default".to_string(),
            PackMetadata::new("web", semver::Version::new(1, 0, 0)),
            Values(defaults),
            Values(values),
        );
        release.notes = Some("Visit http://web.local".to_string());
        release.mark_deployed();
        release
    }

    async fn run_with<E: DocumentEditor>(
        storage: &MockStorageDriver,
        editor: E,
        options: &EditOptions,
    ) -> Result<EditOutcome> {
        let workflow = EditWorkflow::new(
            storage.clone(),
            editor,
            ReleaseUpgrader::new(storage.clone()),
        );
        workflow.run("web", "default", options).await
    }

    fn all_values() -> EditOptions {
        EditOptions {
            all_values: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_changed_nested_value_is_the_only_override() {
        let storage = MockStorageDriver::with_releases(vec![release(
            json!({"a": 1, "b": {"c": 2, "d": 3}}),
            json!({}),
        )]);
        let editor = writes("a: 1\nb:\n  c: 99\n  d: 3\ne: 5\n");

        let outcome = run_with(&storage, editor, &all_values()).await.unwrap();

        let EditOutcome::Upgraded { release, diff } = outcome else {
            panic!("expected an upgrade");
        };
        assert_eq!(release.version, 2);
        assert_eq!(release.values, Values(json!({"b": {"c": 99}, "e": 5})));
        assert_eq!(diff.summary(), "2 added");

        let latest = storage.get_latest("default", "web").await.unwrap();
        assert_eq!(latest.values, Values(json!({"b": {"c": 99}, "e": 5})));
        assert_eq!(latest.notes.as_deref(), Some("Visit http://web.local"));
        assert_eq!(
            storage.get("default", "web", 1).await.unwrap().state,
            ReleaseState::Superseded
        );
    }

    #[tokio::test]
    async fn test_new_key_without_defaults() {
        let storage = MockStorageDriver::with_releases(vec![release(json!({}), json!({}))]);

        let outcome = run_with(&storage, writes("x: y\n"), &EditOptions::default())
            .await
            .unwrap();

        let EditOutcome::Upgraded { release, .. } = outcome else {
            panic!("expected an upgrade");
        };
        assert_eq!(release.values, Values(json!({"x": "y"})));
    }

    #[tokio::test]
    async fn test_untouched_document_is_no_change() {
        let storage = MockStorageDriver::with_releases(vec![release(json!({"a": 1}), json!({}))]);
        storage.reset_counts();

        let editor = untouched();
        let outcome = run_with(&storage, &editor, &all_values()).await.unwrap();

        assert!(matches!(outcome, EditOutcome::NoChange));
        assert_eq!(editor.presented(), "a: 1\n");
        assert_eq!(storage.operation_counts().writes(), 0);
        assert_eq!(storage.release_count(), 1);
    }

    #[tokio::test]
    async fn test_rewriting_identical_bytes_is_no_change() {
        let storage = MockStorageDriver::with_releases(vec![release(json!({"a": 1}), json!({}))]);

        let outcome = run_with(&storage, writes("a: 1\n"), &all_values()).await.unwrap();

        assert!(matches!(outcome, EditOutcome::NoChange));
        assert_eq!(storage.release_count(), 1);
    }

    #[tokio::test]
    async fn test_comment_only_edit_still_upgrades() {
        let storage = MockStorageDriver::with_releases(vec![release(json!({"a": 1}), json!({}))]);

        let outcome = run_with(&storage, writes("# checked\na: 1\n"), &all_values())
            .await
            .unwrap();

        let EditOutcome::Upgraded { release, diff } = outcome else {
            panic!("expected an upgrade");
        };
        assert_eq!(release.version, 2);
        assert!(release.values.is_empty());
        assert!(!diff.has_changes());
    }

    #[tokio::test]
    async fn test_failing_editor_aborts_and_removes_document() {
        let storage = MockStorageDriver::with_releases(vec![release(json!({"a": 1}), json!({}))]);
        storage.reset_counts();
        let editor = ScriptedEditor::new(|_: &Path| Err(CliError::editor("'vi' exited with 1")));

        let err = run_with(&storage, &editor, &EditOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::Editor { .. }));
        assert_eq!(storage.operation_counts().writes(), 0);
        assert!(!editor.seen_path().exists());
    }

    #[tokio::test]
    async fn test_subtraction_disabled_keeps_default_values() {
        let storage = MockStorageDriver::with_releases(vec![release(json!({"a": 1}), json!({}))]);
        let options = EditOptions {
            disable_default_subtraction: true,
            ..Default::default()
        };

        let outcome = run_with(&storage, writes("a: 1\n"), &options).await.unwrap();

        let EditOutcome::Upgraded { release, .. } = outcome else {
            panic!("expected an upgrade");
        };
        assert_eq!(release.values, Values(json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_subtraction_drops_default_values() {
        let storage = MockStorageDriver::with_releases(vec![release(json!({"a": 1}), json!({}))]);

        let outcome = run_with(&storage, writes("a: 1\n"), &EditOptions::default())
            .await
            .unwrap();

        let EditOutcome::Upgraded { release, .. } = outcome else {
            panic!("expected an upgrade");
        };
        assert!(release.values.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_document_is_codec_error() {
        let storage = MockStorageDriver::with_releases(vec![release(json!({"a": 1}), json!({}))]);
        storage.reset_counts();

        let err = run_with(&storage, writes("a: [unclosed\n"), &EditOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::Codec { .. }));
        assert_eq!(storage.operation_counts().writes(), 0);
    }

    #[tokio::test]
    async fn test_unknown_release_is_not_found() {
        let storage = MockStorageDriver::new();
        let editor = untouched();

        let err = run_with(&storage, &editor, &EditOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::NotFound { .. }));
        assert!(editor.seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_revision_is_not_found() {
        let storage = MockStorageDriver::with_releases(vec![release(json!({}), json!({}))]);
        let options = EditOptions {
            revision: 9,
            ..Default::default()
        };

        let err = run_with(&storage, untouched(), &options).await.unwrap_err();
        assert!(matches!(err, CliError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_historical_revision_is_presented_and_upgrades_latest() {
        let mut v1 = release(json!({"replicas": 1}), json!({"replicas": 2}));
        v1.mark_superseded();
        let mut v2 = release(json!({"replicas": 1}), json!({"replicas": 4}));
        v2.version = 2;
        let storage = MockStorageDriver::with_releases(vec![v1, v2]);

        let editor = writes("replicas: 3\n");
        let options = EditOptions {
            revision: 1,
            ..Default::default()
        };
        let outcome = run_with(&storage, &editor, &options).await.unwrap();

        assert_eq!(editor.presented(), "replicas: 2\n");
        let EditOutcome::Upgraded { release, .. } = outcome else {
            panic!("expected an upgrade");
        };
        assert_eq!(release.version, 3);
        assert_eq!(release.values, Values(json!({"replicas": 3})));
        assert_eq!(release.description.as_deref(), Some("Edited values of revision 1"));
    }

    #[tokio::test]
    async fn test_document_name() {
        let storage = MockStorageDriver::with_releases(vec![release(json!({}), json!({}))]);
        let editor = untouched();

        run_with(&storage, &editor, &EditOptions::default()).await.unwrap();

        let path = editor.seen_path();
        let file_name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("reledit-web-"));
        assert!(file_name.ends_with(".yaml"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_upgrade_failure_is_upgrade_error() {
        let storage = MockStorageDriver::with_releases(vec![release(json!({}), json!({}))]);
        storage.fail_writes(true);

        let err = run_with(&storage, writes("x: 1\n"), &EditOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::Upgrade { .. }));
    }

    #[tokio::test]
    async fn test_pending_release_is_refused() {
        let mut pending = release(json!({}), json!({}));
        pending.state = ReleaseState::PendingUpgrade {
            started_at: chrono::Utc::now(),
            timeout: chrono::Duration::minutes(5),
            previous_version: 1,
        };
        let storage = MockStorageDriver::with_releases(vec![pending]);

        let err = run_with(&storage, writes("x: 1\n"), &EditOptions::default())
            .await
            .unwrap_err();

        let CliError::Upgrade { message, help } = err else {
            panic!("expected an upgrade error");
        };
        assert!(message.contains("web"));
        assert!(help.is_some());
    }
}
