//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed YAML, or values that cannot be rendered
    #[error("Failed to parse values document: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
