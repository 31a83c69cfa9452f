//! Per-issue state machine: preflight, invoke, classify, finalize.
//!
//! One [`IssueProcessor::process`] call runs one attempt for one issue and
//! yields an [`IssueOutcome`]: `Success`, `Failed`, or `Retry` after blocking
//! out a detected usage limit. The caller loops on `Retry`.
//!
//! The working tree must be clean before an invocation starts; otherwise
//! changes made by the agent cannot be told apart from pre-existing ones, and
//! the finalize step (commit fallback, completion mark) would attribute the
//! wrong work to the issue.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, instrument, warn};

use crate::core::issues::subjects_mention_issue;
use crate::core::types::{AgentKind, FailureKind, IssueOutcome, SuccessKind, WaitPlan};
use crate::io::completions::CompletionStore;
use crate::io::git::Git;
use crate::io::invoker::AgentInvoker;
use crate::io::prompt::PromptBuilder;
use crate::io::tracker::IssueTracker;
use crate::report::Reporter;

/// Blocks the run until a usage limit should be over.
pub trait Waiter {
    fn wait_for_reset(&self, plan: &WaitPlan);
}

/// Production waiter: sleeps in bounded chunks, printing a countdown line per
/// chunk so long waits stay observable. Not a cancellation point; killing the
/// process is the only way out, and a resumed run recomputes from scratch.
pub struct CountdownWaiter {
    pub reporter: Reporter,
    pub interval_secs: u64,
}

impl Waiter for CountdownWaiter {
    fn wait_for_reset(&self, plan: &WaitPlan) {
        let r = &self.reporter;
        r.warn("============================================================");
        r.warn(format!(
            "SESSION LIMIT HIT - waiting until {} ({}s)",
            plan.resume_at.format("%Y-%m-%d %H:%M UTC"),
            plan.wait_secs
        ));
        r.warn("============================================================");

        let mut remaining = plan.wait_secs.max(0) as u64;
        while remaining > 0 {
            r.warn(format!("  waiting... {} minutes remaining", remaining / 60));
            let chunk = remaining.min(self.interval_secs.max(1));
            std::thread::sleep(std::time::Duration::from_secs(chunk));
            remaining -= chunk;
        }

        r.success("Session limit should be reset. Resuming...");
    }
}

/// Position of an issue within the queue, for report headers.
#[derive(Debug, Clone, Copy)]
pub struct QueueSlot {
    pub index: usize,
    pub total: usize,
}

/// Behavior switches for one run.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub agent: AgentKind,
    pub dry_run: bool,
    pub force: bool,
    pub wait_buffer_secs: i64,
    pub log_dir: PathBuf,
}

/// Everything one issue attempt needs, borrowed from the run driver.
pub struct IssueProcessor<'a, T, A, W>
where
    T: IssueTracker,
    A: AgentInvoker,
    W: Waiter,
{
    pub git: &'a Git,
    pub tracker: &'a T,
    pub invoker: &'a A,
    pub waiter: &'a W,
    pub store: &'a mut CompletionStore,
    pub prompts: &'a PromptBuilder,
    pub reporter: Reporter,
    pub opts: ProcessOptions,
}

impl<T, A, W> IssueProcessor<'_, T, A, W>
where
    T: IssueTracker,
    A: AgentInvoker,
    W: Waiter,
{
    /// Run one attempt of the state machine for `issue`.
    #[instrument(skip_all, fields(issue = issue))]
    pub fn process(&mut self, slot: QueueSlot, issue: &str) -> IssueOutcome {
        let r = self.reporter;
        let agent = self.opts.agent;

        let details = match self.tracker.fetch(issue) {
            Ok(details) => details,
            Err(err) => {
                r.fail(format!("FAILED: unable to fetch issue #{issue}: {err:#}"));
                return IssueOutcome::Failed(FailureKind::Fetch);
            }
        };

        r.info("------------------------------------------------------------");
        r.info(format!(
            "[{}/{}] Issue #{}: {}",
            slot.index, slot.total, issue, details.title
        ));
        r.info("------------------------------------------------------------");

        if self.opts.dry_run {
            if self.store.contains(issue) {
                r.success(format!("[DRY RUN] Already completed #{issue}, would skip"));
            } else {
                r.warn(format!("[DRY RUN] Would process issue #{issue}"));
            }
            return IssueOutcome::Success(SuccessKind::DryRun);
        }

        if self.store.contains(issue) && !self.opts.force {
            r.success(format!(
                "Already completed #{issue}, skipping (use --force to reprocess)"
            ));
            return IssueOutcome::Success(SuccessKind::Skipped);
        }

        match self.git.is_dirty() {
            Ok(false) => {}
            Ok(true) => {
                r.fail("ERROR: uncommitted changes detected. Commit or stash before running.");
                return IssueOutcome::Failed(FailureKind::DirtyTree);
            }
            Err(err) => {
                r.fail(format!("FAILED: cannot determine git status: {err:#}"));
                return IssueOutcome::Failed(FailureKind::GitState);
            }
        }

        let start_head = match self.git.head_id() {
            Ok(head) => head,
            Err(err) => {
                r.fail(format!("FAILED: cannot determine pre-run git HEAD: {err:#}"));
                return IssueOutcome::Failed(FailureKind::GitState);
            }
        };

        let prompt = match self.prompts.render(issue, &details) {
            Ok(prompt) => prompt,
            Err(err) => {
                r.fail(format!("FAILED: cannot build prompt for #{issue}: {err:#}"));
                return IssueOutcome::Failed(FailureKind::Prompt);
            }
        };

        let log_path = self.opts.log_dir.join(format!("{issue}.log"));
        r.warn(format!(
            "Starting {} for issue #{issue}...",
            agent.display_name()
        ));
        r.plain(format!("Log: {}", log_path.display()));

        let invocation = match self.invoker.invoke(&prompt, &log_path) {
            Ok(invocation) => invocation,
            Err(err) => {
                r.fail(format!(
                    "FAILED: {} invocation failed for #{issue}: {err:#}",
                    agent.as_str()
                ));
                return IssueOutcome::Failed(FailureKind::Invocation);
            }
        };
        debug!(exit_code = invocation.exit_code, "agent invocation finished");

        let dialect = agent.dialect();
        if dialect.detect_limit(&invocation.output, invocation.exit_code) {
            if let Ok(true) = self.git.is_dirty() {
                r.warn("Session limit hit mid-work. Committing partial progress...");
                let message = format!(
                    "wip: partial work on #{issue} - {} (session limit hit)",
                    details.title
                );
                if let Err(err) = self.git.commit_all(&message) {
                    r.fail(format!("FAILED: could not commit partial progress: {err:#}"));
                    return IssueOutcome::Failed(FailureKind::Commit);
                }
            }
            let plan = dialect.wait_plan(&invocation.output, Utc::now(), self.opts.wait_buffer_secs);
            self.waiter.wait_for_reset(&plan);
            return IssueOutcome::Retry;
        }

        if invocation.exit_code != 0 {
            r.fail(format!(
                "FAILED: {} exited with code {} for issue #{issue}",
                agent.as_str(),
                invocation.exit_code
            ));
            r.fail(format!("Check log: {}", log_path.display()));
            return IssueOutcome::Failed(FailureKind::AgentExit {
                exit_code: invocation.exit_code,
            });
        }

        let end_head = match self.git.head_id() {
            Ok(head) => head,
            Err(err) => {
                r.fail(format!("FAILED: cannot determine post-run git HEAD: {err:#}"));
                return IssueOutcome::Failed(FailureKind::GitState);
            }
        };

        if end_head != start_head {
            // Diagnostics only: a missing issue reference is worth a warning
            // but never changes the result.
            let head_subject = self.git.last_subject().unwrap_or_default();
            let mentions = match self.git.subjects_between(&start_head, &end_head) {
                Ok(subjects) => subjects_mention_issue(&subjects, issue),
                Err(err) => {
                    warn!(err = %err, "could not list new commit subjects");
                    false
                }
            };

            if let Err(err) = self.store.mark_done(issue) {
                r.fail(format!("FAILED: could not mark #{issue} completed: {err:#}"));
                return IssueOutcome::Failed(FailureKind::CompletionStore);
            }
            r.success(format!(
                "SUCCESS: Issue #{issue} committed by {}",
                agent.display_name()
            ));
            if !head_subject.trim().is_empty() {
                r.success(format!("Commit: {head_subject}"));
            }
            if !mentions {
                r.warn(format!(
                    "WARNING: new commit(s) do not mention #{issue} in subject lines."
                ));
            }
            r.blank();
            return IssueOutcome::Success(SuccessKind::AgentCommit {
                subject_mentions_issue: mentions,
            });
        }

        match self.git.is_dirty() {
            Ok(true) => {
                r.warn(format!(
                    "{} did not commit. Uncommitted changes found, committing now.",
                    agent.display_name()
                ));
                let message = format!(
                    "feat: implement #{issue} - {}\n\nCloses #{issue}",
                    details.title
                );
                if let Err(err) = self.git.commit_all(&message) {
                    r.fail(format!("FAILED: fallback commit failed for #{issue}: {err:#}"));
                    return IssueOutcome::Failed(FailureKind::Commit);
                }
                if let Err(err) = self.store.mark_done(issue) {
                    r.fail(format!("FAILED: could not mark #{issue} completed: {err:#}"));
                    return IssueOutcome::Failed(FailureKind::CompletionStore);
                }
                r.success(format!("SUCCESS: Issue #{issue} committed by runner"));
                r.blank();
                IssueOutcome::Success(SuccessKind::RunnerCommit)
            }
            Ok(false) => {
                r.fail(format!("FAILED: no changes produced for issue #{issue}"));
                r.fail(format!(
                    "{} ran but made no modifications. Check log: {}",
                    agent.display_name(),
                    log_path.display()
                ));
                IssueOutcome::Failed(FailureKind::NoChanges)
            }
            Err(err) => {
                r.fail(format!("FAILED: cannot determine post-run git status: {err:#}"));
                IssueOutcome::Failed(FailureKind::GitState)
            }
        }
    }
}
