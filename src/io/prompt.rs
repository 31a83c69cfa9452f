//! Prompt rendering for agent invocations.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tracing::debug;

use crate::core::types::IssueDetails;

const DEFAULT_TEMPLATE: &str = include_str!("prompts/issue.md");
const TEMPLATE_NAME: &str = "issue";

/// Renders the per-issue prompt from the embedded default template or a
/// user-supplied one.
pub struct PromptBuilder {
    env: Environment<'static>,
}

impl PromptBuilder {
    /// Build with the embedded default template.
    pub fn embedded() -> Self {
        Self::from_source(DEFAULT_TEMPLATE.to_string()).expect("embedded template should be valid")
    }

    /// Build from a template file on disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("read prompt template {}", path.display()))?;
        Self::from_source(source)
            .with_context(|| format!("compile prompt template {}", path.display()))
    }

    fn from_source(source: String) -> Result<Self> {
        let mut env = Environment::new();
        env.add_template_owned(TEMPLATE_NAME, source)
            .context("compile prompt template")?;
        Ok(Self { env })
    }

    /// Render the prompt for one issue.
    pub fn render(&self, id: &str, details: &IssueDetails) -> Result<String> {
        let template = self.env.get_template(TEMPLATE_NAME)?;
        let rendered = template.render(context! {
            issue_number => id,
            issue_title => details.title,
            issue_body => details.body,
        })?;
        debug!(bytes = rendered.len(), "rendered prompt");
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::types::IssueDetails;

    use super::PromptBuilder;

    fn details() -> IssueDetails {
        IssueDetails {
            title: "Fix the frobnicator".to_string(),
            body: "It frobs when it should nicate.".to_string(),
        }
    }

    #[test]
    fn default_template_substitutes_issue_fields() {
        let prompts = PromptBuilder::embedded();
        let rendered = prompts.render("42", &details()).expect("render");
        assert!(rendered.contains("issue #42"));
        assert!(rendered.contains("## Issue: Fix the frobnicator"));
        assert!(rendered.contains("It frobs when it should nicate."));
        assert!(rendered.contains("(closes #42)"));
    }

    #[test]
    fn custom_template_loads_from_disk() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("prompt.tmpl");
        std::fs::write(&path, "Work on #{{ issue_number }}: {{ issue_title }}")
            .expect("write template");

        let prompts = PromptBuilder::from_file(&path).expect("load");
        let rendered = prompts.render("7", &details()).expect("render");
        assert_eq!(rendered, "Work on #7: Fix the frobnicator");
    }

    #[test]
    fn missing_template_file_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(PromptBuilder::from_file(&temp.path().join("absent.tmpl")).is_err());
    }
}
