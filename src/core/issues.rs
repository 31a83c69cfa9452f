//! Issue-id validation and list parsing.

use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::Regex;

static ISSUE_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

/// True when `id` is a bare run of digits, the only accepted id shape.
pub fn is_valid_id(id: &str) -> bool {
    ISSUE_ID_RE.is_match(id)
}

/// Parse a comma-separated id list: entries are trimmed, duplicates dropped
/// (first occurrence wins), non-numeric entries rejected.
pub fn parse_csv(value: &str) -> Result<Vec<String>> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();
    for part in value.split(',') {
        let id = part.trim();
        if id.is_empty() {
            continue;
        }
        if !is_valid_id(id) {
            bail!("invalid issue in --issues: {id:?}");
        }
        if seen.insert(id.to_string()) {
            issues.push(id.to_string());
        }
    }
    if issues.is_empty() {
        bail!("no issues found in --issues");
    }
    Ok(issues)
}

/// Parse issue-file contents: one id per line, `#` comments and blank lines
/// skipped, first whitespace-separated field taken as the id, duplicates
/// dropped. `origin` labels errors (typically the file path).
pub fn parse_issue_lines(contents: &str, origin: &str) -> Result<Vec<String>> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();
    for (lineno, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let id = line.split_whitespace().next().unwrap_or_default();
        if !is_valid_id(id) {
            bail!("invalid issue id at {origin}:{}: {id:?}", lineno + 1);
        }
        if seen.insert(id.to_string()) {
            issues.push(id.to_string());
        }
    }
    if issues.is_empty() {
        bail!("no issue ids found in {origin}");
    }
    Ok(issues)
}

/// Sort ids for deterministic rewrites: numeric when both sides parse as
/// integers, lexicographic otherwise.
pub fn sort_ids(ids: &mut [String]) {
    ids.sort_by(|a, b| match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    });
}

/// True when any subject line mentions `#<issue>` as a whole numeric token.
///
/// Only the right boundary is guarded: a digit immediately after the token
/// rejects the match (`#42` does not hit inside `#420`), but no check is made
/// on what precedes the `#`.
pub fn subjects_mention_issue(subjects: &[String], issue: &str) -> bool {
    if issue.is_empty() {
        return false;
    }
    let needle = format!("#{issue}");
    for subject in subjects {
        let bytes = subject.as_bytes();
        for (idx, _) in subject.match_indices(&needle) {
            let after = idx + needle.len();
            if after >= bytes.len() || !bytes[after].is_ascii_digit() {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::{is_valid_id, parse_csv, parse_issue_lines, sort_ids, subjects_mention_issue};

    fn subjects(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn valid_ids_are_bare_digit_runs() {
        assert!(is_valid_id("42"));
        assert!(is_valid_id("007"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("42a"));
        assert!(!is_valid_id("-1"));
    }

    #[test]
    fn csv_trims_and_dedupes() {
        assert_eq!(parse_csv("1, 2,1,3").unwrap(), vec!["1", "2", "3"]);
    }

    #[test]
    fn csv_rejects_non_numeric() {
        let err = parse_csv("1,abc,3").unwrap_err();
        assert!(err.to_string().contains(r#"invalid issue in --issues: "abc""#));
    }

    #[test]
    fn csv_rejects_empty_list() {
        let err = parse_csv(" , , ").unwrap_err();
        assert!(err.to_string().contains("no issues found in --issues"));
    }

    #[test]
    fn issue_file_skips_comments_and_takes_first_field() {
        let contents = "# backlog\n\n12 fix parser\n15\n12\n";
        assert_eq!(
            parse_issue_lines(contents, "issues.txt").unwrap(),
            vec!["12", "15"]
        );
    }

    #[test]
    fn issue_file_reports_line_numbers() {
        let err = parse_issue_lines("10\nbad\n", "issues.txt").unwrap_err();
        assert!(err.to_string().contains(r#"issues.txt:2: "bad""#));
    }

    #[test]
    fn sort_is_numeric_for_numeric_ids() {
        let mut ids = vec!["10".to_string(), "2".to_string(), "1".to_string()];
        sort_ids(&mut ids);
        assert_eq!(ids, vec!["1", "2", "10"]);
    }

    #[test]
    fn sort_falls_back_to_lexicographic_for_opaque_entries() {
        let mut ids = vec!["10".to_string(), "legacy".to_string(), "2".to_string()];
        sort_ids(&mut ids);
        // "legacy" cannot compare numerically, so its pairs compare as strings.
        assert!(ids.contains(&"legacy".to_string()));
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn subject_token_matches_exact_issue_ref() {
        assert!(subjects_mention_issue(
            &subjects(&["feat: add thing (closes #42)"]),
            "42"
        ));
    }

    #[test]
    fn subject_token_rejects_longer_digit_run() {
        assert!(!subjects_mention_issue(
            &subjects(&["feat: add thing (closes #420)"]),
            "42"
        ));
    }

    #[test]
    fn subject_token_matches_later_occurrence() {
        assert!(subjects_mention_issue(
            &subjects(&["refs #420 and #42"]),
            "42"
        ));
    }

    #[test]
    fn subject_token_ignores_left_boundary() {
        // The left side of the token is deliberately unguarded.
        assert!(subjects_mention_issue(&subjects(&["see 1#42"]), "42"));
    }

    #[test]
    fn subject_token_matches_at_end_of_line() {
        assert!(subjects_mention_issue(&subjects(&["fix: closes #42"]), "42"));
        assert!(!subjects_mention_issue(&subjects(&["unrelated"]), "42"));
        assert!(!subjects_mention_issue(&subjects(&["fix: closes #42"]), ""));
    }
}
