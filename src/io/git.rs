//! Git adapter for the runner.
//!
//! The processor decides success by observing HEAD and worktree state around
//! each invocation, so we keep a small, explicit wrapper around `git`
//! subprocess calls.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Locate the top level of the repository enclosing `dir`.
    #[instrument(skip_all)]
    pub fn discover_root(dir: &Path) -> Result<PathBuf> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(dir)
            .output()
            .context("spawn git rev-parse --show-toplevel")?;
        if !output.status.success() {
            return Err(anyhow!("must run inside a git repository"));
        }
        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(root = %root, "repository root");
        Ok(PathBuf::from(root))
    }

    /// True when the working tree has any staged or unstaged modification.
    pub fn is_dirty(&self) -> Result<bool> {
        let out = self.run_capture(&["status", "--porcelain"])?;
        Ok(!out.trim().is_empty())
    }

    /// Current HEAD commit id.
    pub fn head_id(&self) -> Result<String> {
        let out = self.run_capture(&["rev-parse", "HEAD"])?;
        Ok(out.trim().to_string())
    }

    /// Subject line of the most recent commit.
    pub fn last_subject(&self) -> Result<String> {
        let out = self.run_capture(&["log", "-1", "--pretty=format:%s"])?;
        Ok(out.trim().to_string())
    }

    /// Subject lines of commits in `from..to`, newest first.
    pub fn subjects_between(&self, from: &str, to: &str) -> Result<Vec<String>> {
        let range = format!("{from}..{to}");
        let out = self.run_capture(&["log", "--pretty=format:%s", &range])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Stage everything and commit, bypassing local verification hooks.
    ///
    /// Fails when staging or committing fails (nothing to commit, identity
    /// not configured).
    #[instrument(skip_all)]
    pub fn commit_all(&self, message: &str) -> Result<()> {
        self.run_checked(&["add", "-A"])?;
        self.run_checked(&["commit", "--no-verify", "-m", message])?;
        debug!("committed all changes");
        Ok(())
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}
