//! Stable exit codes for materializer CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed due to invalid config/input or other errors.
pub const INVALID: i32 = 1;
/// The backend throttled the session and the countdown was still running.
pub const LIMITED: i32 = 2;
/// One or more steps could not be placed in the workspace tree.
pub const CONFLICT: i32 = 3;
