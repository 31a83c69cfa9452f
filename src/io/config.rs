//! Runner configuration stored under `.ticket-runner/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::AgentKind;

/// Runner configuration (TOML).
///
/// Intended to be edited by humans; missing fields default to the built-in
/// values. Command-line flags override anything set here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Agent dialect to run when `--agent` is not given.
    pub agent: String,

    /// Model override passed to the agent CLI (empty = provider default).
    pub model: String,

    /// Extra seconds added after a parsed reset time.
    pub wait_buffer_secs: i64,

    /// Hard cap on one agent invocation in seconds (0 = no timeout).
    pub agent_timeout_secs: u64,

    /// Seconds between countdown lines while waiting out a usage limit.
    pub countdown_interval_secs: u64,

    /// Issue list file, relative to the repository root.
    pub issues_file: String,

    /// Log directory, relative to the repository root.
    pub log_dir: String,

    /// Completion file (empty = `<log_dir>/.completed`).
    pub done_file: String,

    /// Prompt template (empty = embedded default, or
    /// `.ticket-runner/prompt.tmpl` when that file exists).
    pub prompt_template: String,

    pub bins: BinsConfig,
}

/// Command names (or paths) for the external CLIs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BinsConfig {
    pub claude: String,
    pub codex: String,
    pub gemini: String,
    pub cursor_agent: String,
    pub gh: String,
}

impl Default for BinsConfig {
    fn default() -> Self {
        Self {
            claude: "claude".to_string(),
            codex: "codex".to_string(),
            gemini: "gemini".to_string(),
            cursor_agent: "cursor-agent".to_string(),
            gh: "gh".to_string(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            agent: "claude".to_string(),
            model: String::new(),
            wait_buffer_secs: 120,
            agent_timeout_secs: 0,
            countdown_interval_secs: 300,
            issues_file: ".ticket-runner/issues.txt".to_string(),
            log_dir: ".ticket-runs".to_string(),
            done_file: String::new(),
            prompt_template: String::new(),
            bins: BinsConfig::default(),
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        self.agent
            .parse::<AgentKind>()
            .map_err(|err| anyhow!("config agent: {err}"))?;
        if self.wait_buffer_secs < 0 {
            return Err(anyhow!("wait_buffer_secs must be non-negative"));
        }
        if self.countdown_interval_secs == 0 {
            return Err(anyhow!("countdown_interval_secs must be > 0"));
        }
        if self.issues_file.trim().is_empty() {
            return Err(anyhow!("issues_file must not be empty"));
        }
        if self.log_dir.trim().is_empty() {
            return Err(anyhow!("log_dir must not be empty"));
        }
        for (name, bin) in [
            ("bins.claude", &self.bins.claude),
            ("bins.codex", &self.bins.codex),
            ("bins.gemini", &self.bins.gemini),
            ("bins.cursor_agent", &self.bins.cursor_agent),
            ("bins.gh", &self.bins.gh),
        ] {
            if bin.trim().is_empty() {
                return Err(anyhow!("{name} must not be empty"));
            }
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RunnerConfig::default()`.
pub fn load_config(path: &Path) -> Result<RunnerConfig> {
    if !path.exists() {
        let cfg = RunnerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RunnerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RunnerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

/// Resolve a config/CLI path against the repository root (absolute paths win).
pub fn resolve_path(root: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{RunnerConfig, load_config, resolve_path, write_config};

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, RunnerConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let cfg = RunnerConfig {
            agent: "codex".to_string(),
            wait_buffer_secs: 30,
            ..RunnerConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "agent = \"gemini\"\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.agent, "gemini");
        assert_eq!(cfg.wait_buffer_secs, 120);
        assert_eq!(cfg.bins.gh, "gh");
    }

    #[test]
    fn unknown_agent_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "agent = \"nope\"\n").expect("write");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn negative_wait_buffer_is_rejected() {
        let cfg = RunnerConfig {
            wait_buffer_secs: -1,
            ..RunnerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn resolve_path_keeps_absolute_values() {
        let root = Path::new("/repo");
        assert_eq!(resolve_path(root, "/etc/x"), Path::new("/etc/x"));
        assert_eq!(resolve_path(root, "logs"), Path::new("/repo/logs"));
    }
}
