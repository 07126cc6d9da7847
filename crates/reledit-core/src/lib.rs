//! reledit Core - value documents and override reconciliation
//!
//! This crate provides the foundational types used throughout reledit:
//! - `Values`: Configuration values with deep merge support
//! - `overrides`: Subtraction of pack defaults from an edited document
//! - `document`: Rendering, parsing and change detection for edited documents
//! - `PackMetadata`: Pack identity recorded with each release

pub mod document;
pub mod error;
pub mod overrides;
pub mod pack;
pub mod values;

pub use document::{has_changed, parse as parse_document, render as render_document};
pub use error::{CoreError, Result};
pub use overrides::{OverrideMode, compute_overrides, reconcile, values_equal};
pub use pack::PackMetadata;
pub use values::Values;
