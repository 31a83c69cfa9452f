//! Shared types for the issue-processing state machine.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::core::dialects::{
    ClaudeDialect, CodexDialect, CursorAgentDialect, Dialect, GeminiDialect,
};

/// Supported agent CLI dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Claude,
    Codex,
    Gemini,
    CursorAgent,
}

impl AgentKind {
    /// Flag-form name, as accepted by `--agent`.
    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::Claude => "claude",
            AgentKind::Codex => "codex",
            AgentKind::Gemini => "gemini",
            AgentKind::CursorAgent => "cursor-agent",
        }
    }

    /// Human-facing name used in report lines.
    pub fn display_name(self) -> &'static str {
        match self {
            AgentKind::Claude => "Claude",
            AgentKind::Codex => "Codex",
            AgentKind::Gemini => "Gemini",
            AgentKind::CursorAgent => "Cursor Agent",
        }
    }

    /// The provider-specific limit/reset conventions for this agent.
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            AgentKind::Claude => &ClaudeDialect,
            AgentKind::Codex => &CodexDialect,
            AgentKind::Gemini => &GeminiDialect,
            AgentKind::CursorAgent => &CursorAgentDialect,
        }
    }
}

impl FromStr for AgentKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "claude" => Ok(AgentKind::Claude),
            "codex" => Ok(AgentKind::Codex),
            "gemini" => Ok(AgentKind::Gemini),
            "cursor-agent" => Ok(AgentKind::CursorAgent),
            _ => Err(anyhow!(
                "agent must be one of: claude, codex, gemini, cursor-agent"
            )),
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue metadata fetched from the tracker, scoped to one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueDetails {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// Captured result of one agent invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub exit_code: i32,
    /// Combined stdout/stderr, identical to the per-issue log file contents.
    pub output: String,
}

/// Computed pause before retrying a limited issue.
///
/// Never persisted: a killed run recomputes from scratch by re-invoking the
/// agent rather than trusting a stale timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPlan {
    pub wait_secs: i64,
    pub resume_at: DateTime<Utc>,
}

/// Per-attempt verdict yielded by the issue processor.
///
/// `Retry` is never terminal for the queue; the driver loops on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueOutcome {
    Success(SuccessKind),
    Failed(FailureKind),
    Retry,
}

/// How a successful attempt concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessKind {
    /// Dry-run mode: nothing was invoked.
    DryRun,
    /// Already recorded as completed; skipped without invoking.
    Skipped,
    /// The agent committed. The flag records whether any new commit subject
    /// mentions the issue as a whole `#<id>` token.
    AgentCommit { subject_mentions_issue: bool },
    /// The agent left uncommitted edits; the runner committed them.
    RunnerCommit,
}

/// Why an attempt failed. Always terminal for the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Tracker lookup failed or returned an empty title.
    Fetch,
    /// Uncommitted changes present before the invocation.
    DirtyTree,
    /// HEAD or worktree status could not be read.
    GitState,
    /// The prompt template could not be rendered.
    Prompt,
    /// The agent process failed to start, timed out, or log I/O failed.
    Invocation,
    /// The agent completed with a non-zero exit and no limit signal.
    AgentExit { exit_code: i32 },
    /// A partial or fallback commit failed.
    Commit,
    /// The agent exited cleanly but changed nothing.
    NoChanges,
    /// The completion store could not be updated.
    CompletionStore,
}

#[cfg(test)]
mod tests {
    use super::AgentKind;

    #[test]
    fn parses_supported_agents() {
        for (name, kind) in [
            ("claude", AgentKind::Claude),
            ("codex", AgentKind::Codex),
            ("gemini", AgentKind::Gemini),
            ("cursor-agent", AgentKind::CursorAgent),
        ] {
            assert_eq!(name.parse::<AgentKind>().unwrap(), kind);
            assert_eq!(kind.as_str(), name);
        }
    }

    #[test]
    fn rejects_unknown_agent() {
        let err = "nope".parse::<AgentKind>().unwrap_err();
        assert!(
            err.to_string()
                .contains("agent must be one of: claude, codex, gemini, cursor-agent")
        );
    }
}
