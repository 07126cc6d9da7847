//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Codec error - the values document could not be parsed or serialized
pub const CODEC_ERROR: i32 = 2;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Not found - unknown release or revision
pub const NOT_FOUND: i32 = 6;

/// Editor error - the editor could not be launched or exited non-zero
pub const EDITOR_ERROR: i32 = 7;

/// Upgrade error - the new revision could not be recorded
pub const UPGRADE_ERROR: i32 = 8;

/// Configuration error (following sysexits.h EX_CONFIG)
pub const CONFIG_ERROR: i32 = 78;
