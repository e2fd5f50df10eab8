//! Stable exit codes for pagetree CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid config, session name or snapshot, or any fatal cycle error.
pub const INVALID: i32 = 1;
/// `pagetree cycle` committed but reported diagnostics.
pub const DIAGNOSTICS: i32 = 2;
