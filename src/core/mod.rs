//! Pure decision logic: issue-id parsing, usage-limit detection, reset-time
//! estimation. Everything here is deterministic and free of I/O.

pub mod dialects;
pub mod issues;
pub mod types;
