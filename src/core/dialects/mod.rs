//! Per-provider conventions for usage-limit detection and reset estimation.
//!
//! Each supported agent CLI signals capacity exhaustion differently: a plain
//! banner with a clock time, JSONL error events with epoch timestamps, a
//! structured result payload with a relative duration, or nothing retryable
//! at all. Detection and reset-time parsing therefore live behind one trait
//! with an implementation per dialect, keeping each provider's quirks
//! isolated and independently testable.
//!
//! Structured per-event signals are always checked before any raw substring
//! fallback: a limit event can hide in otherwise-successful output, and
//! successful output can incidentally contain limit vocabulary.

mod claude;
mod codex;
mod cursor;
mod gemini;

pub use claude::ClaudeDialect;
pub use codex::CodexDialect;
pub use cursor::CursorAgentDialect;
pub use gemini::GeminiDialect;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::core::types::WaitPlan;

/// Wait applied whenever provider output carries no usable reset information.
pub const FALLBACK_WAIT_SECS: i64 = 1800;

/// Provider-specific limit detection and reset-time estimation.
pub trait Dialect: Sync {
    /// Decide whether this invocation was cut short by a usage/rate limit.
    fn detect_limit(&self, output: &str, exit_code: i32) -> bool;

    /// Compute how long to pause before retrying, from the same output.
    ///
    /// Always returns a usable plan: unparseable, zero, or backdated reset
    /// information degrades to [`FALLBACK_WAIT_SECS`] from `now`.
    fn wait_plan(&self, output: &str, now: DateTime<Utc>, buffer_secs: i64) -> WaitPlan;
}

pub(crate) fn fallback_plan(now: DateTime<Utc>) -> WaitPlan {
    WaitPlan {
        wait_secs: FALLBACK_WAIT_SECS,
        resume_at: now + Duration::seconds(FALLBACK_WAIT_SECS),
    }
}

/// Yield every output line that parses as a standalone JSON object.
pub(crate) fn json_object_lines(output: &str) -> impl Iterator<Item = Value> + '_ {
    output.lines().filter_map(|raw| {
        let line = raw.trim();
        if !line.starts_with('{') {
            return None;
        }
        serde_json::from_str::<Value>(line)
            .ok()
            .filter(Value::is_object)
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{FALLBACK_WAIT_SECS, fallback_plan, json_object_lines};

    #[test]
    fn fallback_plan_is_anchored_to_now() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 15, 0, 0).unwrap();
        let plan = fallback_plan(now);
        assert_eq!(plan.wait_secs, FALLBACK_WAIT_SECS);
        assert_eq!(plan.resume_at, now + chrono::Duration::seconds(1800));
    }

    #[test]
    fn json_object_lines_skips_noise() {
        let output = "progress...\n{\"type\":\"error\"}\nnot json {\n{broken\n{\"ok\":1}\n";
        let objects: Vec<_> = json_object_lines(output).collect();
        assert_eq!(objects.len(), 2);
    }
}
