//! Dialect for CLIs that print a plain-text limit banner with a clock-time
//! reset, e.g. "You hit your usage limit. It resets at 5:00 PM UTC.".

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use super::{Dialect, fallback_plan};
use crate::core::types::WaitPlan;

static LIMIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)(out of\s+(extra\s+)?usage|hit your\s+(usage\s+)?limit|exceeded.*(usage|limit)|usage\s+limit|rate\s+limit).*resets?",
    )
    .unwrap()
});

static RESET_AT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)resets?\s+(?:at\s+)?[A-Za-z]*\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\s*\(?(UTC)?\)?")
        .unwrap()
});

pub struct ClaudeDialect;

impl Dialect for ClaudeDialect {
    fn detect_limit(&self, output: &str, _exit_code: i32) -> bool {
        // The banner can appear on exit 0, so the exit code is not consulted.
        LIMIT_RE.is_match(output)
    }

    fn wait_plan(&self, output: &str, now: DateTime<Utc>, buffer_secs: i64) -> WaitPlan {
        let Some(caps) = RESET_AT_RE.captures(output) else {
            return fallback_plan(now);
        };

        let Ok(mut hour) = caps[1].parse::<u32>() else {
            return fallback_plan(now);
        };
        let minute = match caps.get(2) {
            None => 0,
            Some(m) => match m.as_str().parse::<u32>() {
                Ok(v) if v <= 59 => v,
                _ => return fallback_plan(now),
            },
        };
        match caps.get(3).map(|m| m.as_str().to_ascii_lowercase()) {
            Some(marker) if marker == "am" => {
                if hour == 12 {
                    hour = 0;
                }
            }
            Some(marker) if marker == "pm" => {
                if hour != 12 {
                    hour += 12;
                }
            }
            Some(_) => return fallback_plan(now),
            // Without an am/pm marker the hour must already be a 24-hour value.
            None => {
                if hour > 23 {
                    return fallback_plan(now);
                }
            }
        }
        if hour > 23 {
            return fallback_plan(now);
        }

        let Some(reset) = now.date_naive().and_hms_opt(hour, minute, 0) else {
            return fallback_plan(now);
        };
        let mut reset = reset.and_utc();
        // Limits can reset just after midnight relative to "now".
        if reset <= now {
            reset += Duration::days(1);
        }

        let resume_at = reset + Duration::seconds(buffer_secs);
        let wait_secs = (resume_at - now).num_seconds();
        if wait_secs <= 0 {
            fallback_plan(now)
        } else {
            WaitPlan { wait_secs, resume_at }
        }
    }
}
