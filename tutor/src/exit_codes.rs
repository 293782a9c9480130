//! Stable exit codes for the `tutor` CLI.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed due to invalid config, an unknown lesson, or other errors.
pub const INVALID: i32 = 1;
