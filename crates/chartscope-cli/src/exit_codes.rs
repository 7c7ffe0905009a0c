//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions where applicable.

/// Success - operation completed without errors
#[allow(dead_code)]
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Input error - bad locator, conflicting flags, unreadable config
pub const INPUT_ERROR: i32 = 2;

/// Source error - chart could not be fetched or located
pub const SOURCE_ERROR: i32 = 3;

/// Render error - helm template failed
pub const RENDER_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;
