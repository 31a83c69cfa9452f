//! Dialect for providers whose resource exhaustion is terminal.

use chrono::{DateTime, Utc};

use super::{Dialect, fallback_plan};
use crate::core::types::WaitPlan;

pub struct CursorAgentDialect;

impl Dialect for CursorAgentDialect {
    /// Never limited: exhaustion from this provider is not retried.
    fn detect_limit(&self, _output: &str, _exit_code: i32) -> bool {
        false
    }

    fn wait_plan(&self, _output: &str, now: DateTime<Utc>, _buffer_secs: i64) -> WaitPlan {
        // detect_limit never fires for this dialect; keep the always-usable
        // plan contract anyway.
        fallback_plan(now)
    }
}

#[cfg(test)]
mod tests {
    use super::{CursorAgentDialect, Dialect};

    #[test]
    fn never_limited_even_with_limit_vocabulary() {
        let dialect = CursorAgentDialect;
        assert!(!dialect.detect_limit("usage_limit_reached resets_in_seconds: 120", 1));
        assert!(!dialect.detect_limit("rate limit resets at 5:00 PM", 0));
    }
}
