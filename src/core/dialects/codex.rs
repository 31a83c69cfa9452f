//! Dialect for CLIs that emit JSONL events and absolute reset timestamps
//! (`resets_at` epoch seconds, `resets_in_seconds`).

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde_json::Value;

use super::{Dialect, fallback_plan, json_object_lines};
use crate::core::types::WaitPlan;

// The escaped-quote variant covers events serialized inside other strings.
static RESET_TS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)resets_at\\?"?[:\s]+(\d+)"#).unwrap());

static RESET_IN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)resets_in_seconds\\?"?[:\s]+(\d+)"#).unwrap());

const CORROBORATING_TOKENS: [&str; 5] = [
    "resets_at",
    "resets_in_seconds",
    "http 429",
    "too many requests",
    "hit your usage limit",
];

pub struct CodexDialect;

impl Dialect for CodexDialect {
    fn detect_limit(&self, output: &str, exit_code: i32) -> bool {
        // Structured error events win regardless of exit code: the CLI can
        // emit a usage-limit event and still exit 0.
        if error_event_reports_limit(output) {
            return true;
        }
        // On a clean exit with no structured event, raw text that merely
        // mentions limit field names (docs, fixtures echoed in output) must
        // not trigger a retry.
        if exit_code == 0 {
            return false;
        }
        let lower = output.to_lowercase();
        if lower.contains("usage_limit_reached") {
            return true;
        }
        if lower.contains("usage limit") {
            return CORROBORATING_TOKENS
                .iter()
                .any(|token| lower.contains(token));
        }
        false
    }

    fn wait_plan(&self, output: &str, now: DateTime<Utc>, buffer_secs: i64) -> WaitPlan {
        if let Some(caps) = RESET_TS_RE.captures(output)
            && let Ok(secs) = caps[1].parse::<i64>()
            && secs > 0
            && let Some(reset) = DateTime::<Utc>::from_timestamp(secs, 0)
        {
            let resume_at = reset + Duration::seconds(buffer_secs);
            let wait_secs = (resume_at - now).num_seconds();
            if wait_secs > 0 {
                return WaitPlan { wait_secs, resume_at };
            }
            // A stale absolute timestamp falls through to the relative form.
        }

        if let Some(caps) = RESET_IN_RE.captures(output)
            && let Ok(secs) = caps[1].parse::<i64>()
            && secs > 0
        {
            let wait_secs = secs + buffer_secs;
            return WaitPlan {
                wait_secs,
                resume_at: now + Duration::seconds(wait_secs),
            };
        }

        fallback_plan(now)
    }
}

fn error_event_reports_limit(output: &str) -> bool {
    for event in json_object_lines(output) {
        if event.get("type").and_then(Value::as_str) != Some("error") {
            continue;
        }
        for key in ["code", "message"] {
            if let Some(text) = event.get(key).and_then(Value::as_str) {
                let lower = text.to_lowercase();
                if lower.contains("usage_limit_reached") || lower.contains("usage limit") {
                    return true;
                }
            }
        }
        if event.get("resets_at").is_some() {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{CodexDialect, Dialect};
    use crate::core::dialects::FALLBACK_WAIT_SECS;

    #[test]
    fn error_event_overrides_exit_code() {
        let dialect = CodexDialect;
        assert!(dialect.detect_limit(r#"{"type":"error","code":"usage_limit_reached"}"#, 0));
    }

    #[test]
    fn error_event_with_resets_at_counts_as_limited() {
        let dialect = CodexDialect;
        assert!(dialect.detect_limit(r#"{"type":"error","resets_at":1767366000}"#, 0));
    }

    #[test]
    fn raw_limit_text_requires_failed_exit() {
        let dialect = CodexDialect;
        let log = "usage limit reached, resets_in_seconds: 120, http 429";
        assert!(dialect.detect_limit(log, 1));
        assert!(!dialect.detect_limit(log, 0));
    }

    #[test]
    fn incidental_field_names_on_clean_exit_are_not_limits() {
        let dialect = CodexDialect;
        let log = "table includes usage_limit_reached and resets_at fields for tests";
        assert!(!dialect.detect_limit(log, 0));
    }

    #[test]
    fn bare_usage_limit_text_needs_corroboration() {
        let dialect = CodexDialect;
        assert!(!dialect.detect_limit("usage limit may apply someday", 1));
        assert!(dialect.detect_limit("usage limit: too many requests", 1));
    }

    #[test]
    fn uses_resets_at_when_timestamp_is_in_the_future() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 15, 0, 0).unwrap();
        let future = (now + chrono::Duration::minutes(20)).timestamp();
        let log = format!(r#"{{"code":"usage_limit_reached","resets_at": {future}}}"#);
        let plan = CodexDialect.wait_plan(&log, now, 120);
        assert_eq!(plan.wait_secs, 1320);
        assert_eq!(plan.resume_at, now + chrono::Duration::minutes(22));
    }

    #[test]
    fn supports_escaped_resets_at_key() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 15, 0, 0).unwrap();
        let future = (now + chrono::Duration::minutes(20)).timestamp();
        let log = format!(r#"{{"message":"resets_at\": {future}"}}"#);
        let plan = CodexDialect.wait_plan(&log, now, 120);
        assert_eq!(plan.wait_secs, 1320);
    }

    #[test]
    fn stale_resets_at_falls_through_to_relative_seconds() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 15, 0, 0).unwrap();
        let past = (now - chrono::Duration::minutes(5)).timestamp();
        let log = format!(r#"{{"resets_at": {past}, "resets_in_seconds": 90}}"#);
        let plan = CodexDialect.wait_plan(&log, now, 120);
        assert_eq!(plan.wait_secs, 210);
        assert_eq!(plan.resume_at, now + chrono::Duration::seconds(210));
    }

    #[test]
    fn uses_resets_in_seconds_when_present() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 15, 0, 0).unwrap();
        let plan = CodexDialect.wait_plan("usage limit; resets_in_seconds: 45", now, 120);
        assert_eq!(plan.wait_secs, 165);
    }

    #[test]
    fn falls_back_on_malformed_values() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 15, 0, 0).unwrap();
        let plan = CodexDialect.wait_plan("usage limit; resets_in_seconds: nope", now, 120);
        assert_eq!(plan.wait_secs, FALLBACK_WAIT_SECS);
        assert_eq!(plan.resume_at, now + chrono::Duration::seconds(FALLBACK_WAIT_SECS));
    }
}
