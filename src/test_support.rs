//! Test-only doubles and temp-repo scaffolding.
//!
//! Gated behind the `test-support` feature so integration tests can script
//! agent behavior and build real throwaway git repositories without spawning
//! any agent CLI.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow, bail};

use crate::core::types::{Invocation, IssueDetails, WaitPlan};
use crate::io::git::Git;
use crate::io::invoker::AgentInvoker;
use crate::io::tracker::IssueTracker;
use crate::processor::Waiter;

/// Temp directory holding a real git repository with one seed commit.
pub struct TestRepo {
    dir: tempfile::TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp dir")?;
        let repo = Self { dir };
        repo.git_ok(&["init", "-q"])?;
        repo.git_ok(&["config", "user.email", "runner@example.com"])?;
        repo.git_ok(&["config", "user.name", "Ticket Runner Tests"])?;
        repo.write_file("README.md", "seed\n")?;
        // Log dir and completion file live inside the repo; keep them out of
        // the dirty-tree checks the same way a real checkout would.
        repo.write_file(".gitignore", ".ticket-runs/\n")?;
        repo.git_ok(&["add", "-A"])?;
        repo.git_ok(&["commit", "-q", "-m", "chore: seed repository"])?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git(&self) -> Git {
        Git::new(self.path())
    }

    /// Write a file relative to the repo root, creating parent directories.
    pub fn write_file(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    /// Write a file and commit it with `message`.
    pub fn commit_file(&self, rel: &str, contents: &str, message: &str) -> Result<()> {
        self.write_file(rel, contents)?;
        self.git_ok(&["add", "-A"])?;
        self.git_ok(&["commit", "-q", "-m", message])
    }

    fn git_ok(&self, args: &[&str]) -> Result<()> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if !output.status.success() {
            bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// Tracker returning the same canned metadata for every id.
pub struct ScriptedTracker {
    pub details: IssueDetails,
}

impl ScriptedTracker {
    pub fn with_title(title: &str) -> Self {
        Self {
            details: IssueDetails {
                title: title.to_string(),
                body: format!("{title} body"),
            },
        }
    }
}

impl IssueTracker for ScriptedTracker {
    fn fetch(&self, _id: &str) -> Result<IssueDetails> {
        Ok(self.details.clone())
    }
}

/// Tracker whose every lookup fails.
pub struct FailingTracker;

impl IssueTracker for FailingTracker {
    fn fetch(&self, id: &str) -> Result<IssueDetails> {
        Err(anyhow!("issue {id} not found"))
    }
}

/// One scripted agent response.
pub struct ScriptedInvocation {
    pub exit_code: i32,
    pub output: String,
    /// Applied to the repo before returning, to simulate agent side effects
    /// (edits, commits). `None` leaves the repo untouched.
    pub action: Option<Box<dyn Fn(&Path) -> Result<()>>>,
}

impl ScriptedInvocation {
    pub fn clean_exit(output: &str) -> Self {
        Self {
            exit_code: 0,
            output: output.to_string(),
            action: None,
        }
    }

    pub fn failed_exit(exit_code: i32, output: &str) -> Self {
        Self {
            exit_code,
            output: output.to_string(),
            action: None,
        }
    }

    pub fn with_action(mut self, action: impl Fn(&Path) -> Result<()> + 'static) -> Self {
        self.action = Some(Box::new(action));
        self
    }
}

/// Invoker that pops scripted responses in order, writing each response's
/// output to the log path the way the real invoker would.
pub struct ScriptedInvoker {
    workdir: PathBuf,
    script: RefCell<VecDeque<ScriptedInvocation>>,
}

impl ScriptedInvoker {
    pub fn new(workdir: impl Into<PathBuf>, script: Vec<ScriptedInvocation>) -> Self {
        Self {
            workdir: workdir.into(),
            script: RefCell::new(script.into()),
        }
    }

    /// Scripted responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.borrow().len()
    }
}

impl AgentInvoker for ScriptedInvoker {
    fn invoke(&self, _prompt: &str, log_path: &Path) -> Result<Invocation> {
        let step = self
            .script
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted invoker exhausted"))?;
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create log dir {}", parent.display()))?;
        }
        fs::write(log_path, &step.output)
            .with_context(|| format!("write log {}", log_path.display()))?;
        if let Some(action) = &step.action {
            action(&self.workdir)?;
        }
        Ok(Invocation {
            exit_code: step.exit_code,
            output: step.output,
        })
    }
}

/// Waiter that records plans instead of sleeping.
#[derive(Default)]
pub struct RecordingWaiter {
    pub plans: RefCell<Vec<WaitPlan>>,
}

impl Waiter for RecordingWaiter {
    fn wait_for_reset(&self, plan: &WaitPlan) {
        self.plans.borrow_mut().push(*plan);
    }
}
