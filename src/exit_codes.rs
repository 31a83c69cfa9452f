//! Stable exit codes for ticket-runner CLI commands.

/// Command succeeded; every processed issue completed.
pub const OK: i32 = 0;
/// At least one issue failed, or setup was invalid.
pub const FAILED: i32 = 1;
/// Invalid command-line usage (clap reports these itself).
pub const USAGE: i32 = 2;
