//! Issue-tracker client backed by the GitHub CLI.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

use crate::core::types::IssueDetails;

/// Source of issue metadata.
pub trait IssueTracker {
    /// Fetch title and body for `id`. Fails on unknown ids and empty titles.
    fn fetch(&self, id: &str) -> Result<IssueDetails>;
}

/// Tracker that shells out to `gh issue view`.
pub struct GhIssueTracker {
    pub bin: String,
    pub workdir: PathBuf,
}

impl IssueTracker for GhIssueTracker {
    #[instrument(skip_all, fields(issue = id))]
    fn fetch(&self, id: &str) -> Result<IssueDetails> {
        let output = Command::new(&self.bin)
            .args(["issue", "view", id, "--json", "title,body"])
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn {} issue view {id}", self.bin))?;
        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(anyhow!(
                "{} issue view {id} failed: {}",
                self.bin,
                combined.trim()
            ));
        }
        let details: IssueDetails =
            serde_json::from_slice(&output.stdout).context("parse issue json")?;
        if details.title.is_empty() {
            return Err(anyhow!("empty issue title from {}", self.bin));
        }
        debug!(title = %details.title, "fetched issue");
        Ok(details)
    }
}
