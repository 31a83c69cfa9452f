//! Dialect for CLIs that report quota errors in a structured result payload
//! and express reset timing as a relative duration ("resets after 2h30m").

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde_json::Value;

use super::{Dialect, fallback_plan, json_object_lines};
use crate::core::types::WaitPlan;

static QUOTA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)(terminalquotaerror|quota\s+exceeded|rate\s+limit)").unwrap());

static RESET_AFTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)resets?\s+(?:after\s+)?(\d+h)?(\d+m)?(\d+s)?").unwrap());

static DURATION_PART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)([hms])").unwrap());

pub struct GeminiDialect;

impl Dialect for GeminiDialect {
    fn detect_limit(&self, output: &str, exit_code: i32) -> bool {
        // Error payloads win regardless of exit code.
        if error_payload_reports_limit(output) {
            return true;
        }
        if exit_code == 0 {
            return false;
        }
        QUOTA_RE.is_match(output)
    }

    fn wait_plan(&self, output: &str, now: DateTime<Utc>, buffer_secs: i64) -> WaitPlan {
        if let Some(caps) = RESET_AFTER_RE.captures(output) {
            let duration_text: String = (1..=3)
                .filter_map(|i| caps.get(i))
                .map(|m| m.as_str())
                .collect();
            if !duration_text.is_empty() {
                let duration_secs = duration_seconds(&duration_text);
                if duration_secs > 0 {
                    let wait_secs = duration_secs + buffer_secs;
                    return WaitPlan {
                        wait_secs,
                        resume_at: now + Duration::seconds(wait_secs),
                    };
                }
            }
        }
        fallback_plan(now)
    }
}

fn error_payload_reports_limit(output: &str) -> bool {
    for payload in json_object_lines(output) {
        if payload.get("is_error").and_then(Value::as_bool) != Some(true) {
            continue;
        }
        let combined = ["result", "message"]
            .iter()
            .filter_map(|key| payload.get(*key).and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        if QUOTA_RE.is_match(&combined) {
            return true;
        }
    }
    false
}

/// Sum an `NhNmNs` duration into seconds. Zero when nothing parses.
fn duration_seconds(text: &str) -> i64 {
    let mut total = 0;
    for caps in DURATION_PART_RE.captures_iter(&text.to_lowercase()) {
        let Ok(value) = caps[1].parse::<i64>() else {
            return 0;
        };
        total += match &caps[2] {
            "h" => value * 3600,
            "m" => value * 60,
            _ => value,
        };
    }
    total
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Dialect, GeminiDialect};
    use crate::core::dialects::FALLBACK_WAIT_SECS;

    #[test]
    fn quota_text_requires_failed_exit() {
        let dialect = GeminiDialect;
        let log = "TerminalQuotaError: quota exceeded, please wait";
        assert!(dialect.detect_limit(log, 1));
        assert!(!dialect.detect_limit(log, 0));
    }

    #[test]
    fn error_payload_overrides_exit_code() {
        let dialect = GeminiDialect;
        let log = r#"{"is_error":true,"result":"TerminalQuotaError: quota exceeded"}"#;
        assert!(dialect.detect_limit(log, 0));
    }

    #[test]
    fn non_error_payload_is_ignored() {
        let dialect = GeminiDialect;
        let log = r#"{"is_error":false,"result":"quota exceeded mentioned in docs"}"#;
        assert!(!dialect.detect_limit(log, 0));
    }

    #[test]
    fn unrelated_failure_is_not_limited() {
        let dialect = GeminiDialect;
        assert!(!dialect.detect_limit("authentication failed", 1));
    }

    #[test]
    fn parses_hour_and_minute_duration() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 15, 0, 0).unwrap();
        let plan = GeminiDialect.wait_plan("rate limit reached, resets after 2h30m", now, 120);
        assert_eq!(plan.wait_secs, 9120);
        assert_eq!(plan.resume_at, now + chrono::Duration::seconds(9120));
    }

    #[test]
    fn parses_minute_duration() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 15, 0, 0).unwrap();
        let plan = GeminiDialect.wait_plan("quota exceeded; resets after 45m", now, 120);
        assert_eq!(plan.wait_secs, 2820);
    }

    #[test]
    fn parses_second_duration() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 15, 0, 0).unwrap();
        let plan = GeminiDialect.wait_plan("quota exceeded; resets after 30s", now, 120);
        assert_eq!(plan.wait_secs, 150);
    }

    #[test]
    fn falls_back_when_duration_is_malformed() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 15, 0, 0).unwrap();
        let plan = GeminiDialect.wait_plan("quota exceeded; resets after soon", now, 120);
        assert_eq!(plan.wait_secs, FALLBACK_WAIT_SECS);
    }

    #[test]
    fn falls_back_when_parsed_duration_is_zero() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 15, 0, 0).unwrap();
        let plan = GeminiDialect.wait_plan("quota exceeded; resets after 0m", now, 120);
        assert_eq!(plan.wait_secs, FALLBACK_WAIT_SECS);
    }
}
