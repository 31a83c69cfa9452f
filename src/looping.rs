//! Queue driver: processes issues in order, retrying limited attempts.

use tracing::instrument;

use crate::core::types::IssueOutcome;
use crate::io::invoker::AgentInvoker;
use crate::io::tracker::IssueTracker;
use crate::processor::{IssueProcessor, QueueSlot, Waiter};

/// Counts for the end-of-run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn all_ok(&self) -> bool {
        self.failed == 0
    }
}

/// Process the whole queue in order.
///
/// A `Retry` outcome re-runs the same issue after its wait completes. The
/// first `Failed` stops the queue: later issues may build on artifacts from
/// earlier ones, so skipping ahead is unsafe.
#[instrument(skip_all, fields(total = issues.len()))]
pub fn run_queue<T, A, W>(
    processor: &mut IssueProcessor<'_, T, A, W>,
    issues: &[String],
) -> RunSummary
where
    T: IssueTracker,
    A: AgentInvoker,
    W: Waiter,
{
    let mut summary = RunSummary::default();
    let total = issues.len();
    for (i, issue) in issues.iter().enumerate() {
        let slot = QueueSlot {
            index: i + 1,
            total,
        };
        let mut outcome = processor.process(slot, issue);
        while outcome == IssueOutcome::Retry {
            processor.reporter.info(format!(
                "Retrying issue #{issue} after session limit reset..."
            ));
            outcome = processor.process(slot, issue);
        }
        match outcome {
            IssueOutcome::Success(_) => summary.succeeded += 1,
            _ => {
                summary.failed += 1;
                processor
                    .reporter
                    .fail(format!("Stopping due to failure on issue #{issue}"));
                break;
            }
        }
    }
    summary
}
