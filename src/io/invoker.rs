//! Agent invocation behind a trait so tests can script outcomes.
//!
//! The [`AgentInvoker`] trait decouples the issue processor from the actual
//! agent CLIs. The production implementation builds the per-dialect argv and
//! runs it through the teeing process helper; tests substitute scripted
//! invokers that never spawn anything.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{info, instrument};

use crate::core::types::{AgentKind, Invocation};
use crate::io::config::BinsConfig;
use crate::io::process::run_tee;

/// Abstraction over agent execution backends.
pub trait AgentInvoker {
    /// Run the agent once with `prompt`, teeing output to `log_path`.
    ///
    /// A completed invocation returns its exit code and captured output even
    /// when the exit code is non-zero; only start/log failures are errors.
    fn invoke(&self, prompt: &str, log_path: &Path) -> Result<Invocation>;
}

/// Invoker that spawns the configured agent CLI.
pub struct CliAgentInvoker {
    pub kind: AgentKind,
    pub bins: BinsConfig,
    pub model: Option<String>,
    pub workdir: PathBuf,
    /// `None` disables the invocation timeout.
    pub timeout: Option<Duration>,
}

impl CliAgentInvoker {
    /// Per-dialect argv. The second value is true when the prompt goes to
    /// stdin instead of a trailing argument.
    fn command(&self, prompt: &str) -> (Command, bool) {
        match self.kind {
            AgentKind::Claude => {
                let mut cmd = Command::new(&self.bins.claude);
                cmd.args([
                    "--print",
                    "--verbose",
                    "--output-format",
                    "text",
                    "--dangerously-skip-permissions",
                ]);
                if let Some(model) = &self.model {
                    cmd.args(["--model", model]);
                }
                (cmd, true)
            }
            AgentKind::Codex => {
                let mut cmd = Command::new(&self.bins.codex);
                cmd.args(["exec", "--json", "--dangerously-bypass-approvals-and-sandbox"]);
                if let Some(model) = &self.model {
                    cmd.args(["--model", model]);
                }
                cmd.arg(prompt);
                (cmd, false)
            }
            AgentKind::Gemini => {
                let mut cmd = Command::new(&self.bins.gemini);
                cmd.args(["--output-format", "json", "--yolo"]);
                if let Some(model) = &self.model {
                    cmd.args(["-m", model]);
                }
                cmd.args(["-p", prompt]);
                (cmd, false)
            }
            AgentKind::CursorAgent => {
                let mut cmd = Command::new(&self.bins.cursor_agent);
                cmd.args(["--print", "--output-format", "json", "--force"]);
                if let Some(model) = &self.model {
                    cmd.args(["--model", model]);
                }
                cmd.arg(prompt);
                (cmd, false)
            }
        }
    }
}

impl AgentInvoker for CliAgentInvoker {
    #[instrument(skip_all, fields(agent = self.kind.as_str(), log = %log_path.display()))]
    fn invoke(&self, prompt: &str, log_path: &Path) -> Result<Invocation> {
        let (mut cmd, prompt_on_stdin) = self.command(prompt);
        cmd.current_dir(&self.workdir);
        info!(workdir = %self.workdir.display(), "starting agent");

        let stdin = prompt_on_stdin.then(|| prompt.as_bytes());
        let output = run_tee(cmd, stdin, log_path, self.timeout)
            .with_context(|| format!("run {} agent", self.kind.as_str()))?;
        if output.timed_out {
            return Err(anyhow!(
                "{} timed out after {:?}",
                self.kind.as_str(),
                self.timeout.unwrap_or_default()
            ));
        }

        Ok(Invocation {
            exit_code: output.status.code().unwrap_or(-1),
            output: output.combined,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::core::types::AgentKind;
    use crate::io::config::BinsConfig;

    use super::CliAgentInvoker;

    fn invoker(kind: AgentKind, model: Option<&str>) -> CliAgentInvoker {
        CliAgentInvoker {
            kind,
            bins: BinsConfig::default(),
            model: model.map(str::to_string),
            workdir: std::env::temp_dir(),
            timeout: None,
        }
    }

    fn argv(cmd: &std::process::Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn claude_feeds_prompt_on_stdin() {
        let (cmd, on_stdin) = invoker(AgentKind::Claude, None).command("do the thing");
        assert!(on_stdin);
        assert_eq!(cmd.get_program().to_string_lossy(), "claude");
        assert!(!argv(&cmd).contains(&"do the thing".to_string()));
    }

    #[test]
    fn codex_appends_prompt_argument() {
        let (cmd, on_stdin) = invoker(AgentKind::Codex, Some("gpt-5")).command("do the thing");
        assert!(!on_stdin);
        let args = argv(&cmd);
        assert_eq!(args.first().map(String::as_str), Some("exec"));
        assert!(args.contains(&"--model".to_string()));
        assert!(args.contains(&"gpt-5".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("do the thing"));
    }

    #[test]
    fn gemini_uses_short_model_flag() {
        let (cmd, _) = invoker(AgentKind::Gemini, Some("gemini-pro")).command("p");
        let args = argv(&cmd);
        assert!(args.contains(&"-m".to_string()));
        assert!(args.contains(&"--yolo".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("p"));
    }

    #[test]
    fn cursor_agent_forces_print_mode() {
        let (cmd, on_stdin) = invoker(AgentKind::CursorAgent, None).command("p");
        assert!(!on_stdin);
        let args = argv(&cmd);
        assert!(args.contains(&"--force".to_string()));
        assert_eq!(cmd.get_program().to_string_lossy(), "cursor-agent");
    }
}
