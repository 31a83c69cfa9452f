//! Queue-driven issue runner for coding-agent CLIs.
//!
//! Works through a list of tracker issues one at a time: each issue is turned
//! into a prompt, handed to an external agent CLI, and the repository is
//! inspected before and after the invocation to decide whether the agent
//! actually produced a commit (or left edits for the runner to commit).
//! Provider usage limits are recognized in the captured output and converted
//! into a timed retry instead of a failure.
//!
//! The crate enforces a strict separation:
//!
//! - **[`core`]**: pure, deterministic logic (issue-id parsing, limit
//!   detection, reset-time estimation). No I/O, fully testable in isolation.
//! - **[`io`]**: side-effecting operations (filesystem, git, subprocesses).
//!
//! Orchestration modules ([`processor`], [`looping`]) coordinate core logic
//! with I/O to implement the CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
pub mod processor;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
