//! Colored operator-facing report lines.
//!
//! Product output (banners, per-issue progress, the final summary) goes to
//! stdout through [`Reporter`]; dev diagnostics go to stderr via `tracing`
//! ([`crate::logging`]).

use std::fmt::Display;

use owo_colors::{OwoColorize, Style};

/// Writes styled report lines, or plain text when color is disabled.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    colored: bool,
}

impl Reporter {
    /// `no_color` disables styling, as does a non-empty `NO_COLOR` env var.
    pub fn new(no_color: bool) -> Self {
        let env_no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        Self {
            colored: !(no_color || env_no_color),
        }
    }

    /// Section headers and progress framing.
    pub fn info(&self, msg: impl Display) {
        self.line(Style::new().blue(), msg);
    }

    /// Positive outcomes.
    pub fn success(&self, msg: impl Display) {
        self.line(Style::new().green(), msg);
    }

    /// Warnings, dry-run notices, wait countdowns.
    pub fn warn(&self, msg: impl Display) {
        self.line(Style::new().yellow().bold(), msg);
    }

    /// Failures.
    pub fn fail(&self, msg: impl Display) {
        self.line(Style::new().red(), msg);
    }

    /// Unstyled line.
    pub fn plain(&self, msg: impl Display) {
        println!("{msg}");
    }

    /// Empty spacer line.
    pub fn blank(&self) {
        println!();
    }

    fn line(&self, style: Style, msg: impl Display) {
        if self.colored {
            println!("{}", msg.style(style));
        } else {
            println!("{msg}");
        }
    }
}
