//! Launching the user's editor on a values document

use regex::{Captures, Regex};
use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::error::{CliError, Result};

/// Editor command used when none is configured
pub const DEFAULT_EDITOR: &str = "$EDITOR";

/// Editor used when the configured command expands to nothing
pub const FALLBACK_EDITOR: &str = "vi";

static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("env reference pattern is valid")
});

/// Something that lets the user edit a file in place
pub trait DocumentEditor: Send + Sync {
    /// Block until editing of `path` is finished
    fn edit(&self, path: &Path) -> Result<()>;
}

impl<T: DocumentEditor + ?Sized> DocumentEditor for &T {
    fn edit(&self, path: &Path) -> Result<()> {
        (**self).edit(path)
    }
}

/// Runs an external command with the file path as last argument
///
/// The command line is split on whitespace, without shell quoting rules.
/// The editor inherits stdin, stdout and stderr.
#[derive(Debug, Clone)]
pub struct CommandEditor {
    command: String,
}

impl CommandEditor {
    /// Use `command` as is
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Resolve the editor from a flag value and a configured value
    ///
    /// `$VAR` and `${VAR}` references are expanded from the environment.
    pub fn resolve(flag: Option<&str>, configured: Option<&str>) -> Self {
        let template = flag.or(configured).unwrap_or(DEFAULT_EDITOR);
        let expanded = expand_env(template);
        if expanded.trim().is_empty() {
            tracing::debug!(template, "editor command is empty, using {}", FALLBACK_EDITOR);
            return Self::new(FALLBACK_EDITOR);
        }
        Self::new(expanded)
    }

    /// The command line, without the file argument
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl DocumentEditor for CommandEditor {
    fn edit(&self, path: &Path) -> Result<()> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| CliError::editor("editor command is empty"))?;

        tracing::debug!(command = %self.command, path = %path.display(), "launching editor");

        let status = run_blocking(|| Command::new(program).args(parts).arg(path).status())
            .map_err(|e| {
                CliError::editor_with_help(
                    format!("failed to launch '{}': {}", program, e),
                    "set --editor, RELEDIT_EDITOR or EDITOR to an installed editor",
                )
            })?;

        if !status.success() {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "a signal".to_string());
            return Err(CliError::editor(format!(
                "'{}' exited with {}, no changes applied",
                self.command, code
            )));
        }
        Ok(())
    }
}

/// Run a blocking call, letting a multi-threaded runtime move its other tasks off this worker
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Replace `$VAR` and `${VAR}` with environment values
///
/// Unset variables expand to an empty string.
pub fn expand_env(input: &str) -> String {
    ENV_REF
        .replace_all(input, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            std::env::var(name).unwrap_or_default()
        })
        .into_owned()
}
