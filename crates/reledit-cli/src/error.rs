//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use miette::Diagnostic;
use reledit_core::CoreError;
use reledit_kube::KubeError;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Unknown release or revision
    #[error("{message}")]
    #[diagnostic(code(reledit::cli::not_found))]
    NotFound {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Editor could not be launched or exited with a failure
    #[error("Editor error: {message}")]
    #[diagnostic(code(reledit::cli::editor))]
    Editor {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Values document could not be parsed or serialized
    #[error("Invalid values document: {message}")]
    #[diagnostic(code(reledit::cli::codec))]
    Codec {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Upgrade of the release failed
    #[error("Upgrade failed: {message}")]
    #[diagnostic(code(reledit::cli::upgrade))]
    Upgrade {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Configuration file or flag problem
    #[error("Configuration error: {message}")]
    #[diagnostic(code(reledit::cli::config))]
    Config { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(reledit::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(reledit::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::Editor { .. } => exit_codes::EDITOR_ERROR,
            CliError::Codec { .. } => exit_codes::CODEC_ERROR,
            CliError::Upgrade { .. } => exit_codes::UPGRADE_ERROR,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create an editor error
    pub fn editor(message: impl Into<String>) -> Self {
        Self::Editor {
            message: message.into(),
            help: None,
        }
    }

    /// Create an editor error with help text
    pub fn editor_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Editor {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wrap a failure of the upgrade step
    ///
    /// Not-found errors keep their own kind: the release vanished between
    /// reading it and upgrading it.
    pub fn upgrade(err: KubeError) -> Self {
        if err.is_not_found() {
            return Self::from(err);
        }
        let help = match &err {
            KubeError::OperationInProgress { .. } => {
                Some("wait for the running operation to finish, then edit again".to_string())
            }
            KubeError::StuckRelease { .. } => {
                Some("the previous operation timed out; inspect the release history".to_string())
            }
            KubeError::ReleaseChanged { .. } => {
                Some("another revision was recorded meanwhile; edit again".to_string())
            }
            KubeError::Timeout(_) => Some("raise --timeout".to_string()),
            _ => None,
        };
        Self::Upgrade {
            message: err.to_string(),
            help,
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::ReleaseNotFound { .. } => CliError::NotFound {
                message: err.to_string(),
                help: Some("check the release name and --namespace".to_string()),
            },
            KubeError::RevisionNotFound { .. } => CliError::NotFound {
                message: err.to_string(),
                help: Some("use --revision 0 for the latest revision".to_string()),
            },
            KubeError::Values(core) => core.into(),
            KubeError::Io(io) => io.into(),
            KubeError::InvalidConfig(message) => CliError::Config { message },
            other => CliError::Other {
                message: other.to_string(),
            },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        CliError::Codec {
            message: err.to_string(),
            help: Some("the edit was discarded; fix the YAML syntax and edit again".to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
