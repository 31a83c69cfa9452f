//! Durable record of issues already processed successfully.
//!
//! Backing file: UTF-8 text, one issue id per non-blank line. The file is
//! created empty on open so "no completions yet" stays distinguishable from
//! "store unreadable". Resets rewrite the whole file: it is small, and a
//! rewrite cannot leave a torn half-line behind.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::core::issues::sort_ids;

#[derive(Debug)]
pub struct CompletionStore {
    path: PathBuf,
    done: HashSet<String>,
}

impl CompletionStore {
    /// Open the store, creating an empty backing file when missing.
    ///
    /// Every non-blank trimmed line loads as an id; malformed historical
    /// entries are tolerated as opaque strings.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create completion dir {}", parent.display()))?;
        }
        if !path.exists() {
            fs::write(&path, "")
                .with_context(|| format!("create completion file {}", path.display()))?;
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("read completion file {}", path.display()))?;
        let done: HashSet<String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        debug!(completed = done.len(), "loaded completion store");
        Ok(Self { path, done })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.done.contains(id)
    }

    /// Record `id` as completed. Idempotent: no I/O when already present.
    pub fn mark_done(&mut self, id: &str) -> Result<()> {
        if self.done.contains(id) {
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open completion file {}", self.path.display()))?;
        writeln!(file, "{id}")
            .with_context(|| format!("append completion file {}", self.path.display()))?;
        self.done.insert(id.to_string());
        Ok(())
    }

    /// Forget one id and rewrite the backing file.
    pub fn reset_one(&mut self, id: &str) -> Result<()> {
        self.done.remove(id);
        self.rewrite()
    }

    /// Forget everything and truncate the backing file.
    pub fn reset_all(&mut self) -> Result<()> {
        self.done.clear();
        fs::write(&self.path, "")
            .with_context(|| format!("reset completion file {}", self.path.display()))
    }

    fn rewrite(&self) -> Result<()> {
        let mut ids: Vec<String> = self.done.iter().cloned().collect();
        sort_ids(&mut ids);
        let mut content = ids.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        fs::write(&self.path, content)
            .with_context(|| format!("rewrite completion file {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::CompletionStore;

    #[test]
    fn open_creates_missing_backing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("runs/.completed");
        let store = CompletionStore::open(&path).expect("open");
        assert!(path.exists());
        assert!(!store.contains("1"));
    }

    #[test]
    fn mark_done_persists_and_is_idempotent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".completed");
        let mut store = CompletionStore::open(&path).expect("open");

        store.mark_done("42").expect("mark");
        store.mark_done("42").expect("mark again");
        assert!(store.contains("42"));
        assert_eq!(fs::read_to_string(&path).expect("read"), "42\n");

        let reloaded = CompletionStore::open(&path).expect("reopen");
        assert!(reloaded.contains("42"));
    }

    #[test]
    fn reset_one_leaves_other_ids_alone() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".completed");
        let mut store = CompletionStore::open(&path).expect("open");
        store.mark_done("10").expect("mark");
        store.mark_done("2").expect("mark");

        store.reset_one("10").expect("reset");
        assert!(!store.contains("10"));
        assert!(store.contains("2"));
        assert_eq!(fs::read_to_string(&path).expect("read"), "2\n");
    }

    #[test]
    fn reset_rewrites_in_numeric_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".completed");
        let mut store = CompletionStore::open(&path).expect("open");
        for id in ["10", "2", "33", "1"] {
            store.mark_done(id).expect("mark");
        }

        store.reset_one("33").expect("reset");
        assert_eq!(fs::read_to_string(&path).expect("read"), "1\n2\n10\n");
    }

    #[test]
    fn reset_all_empties_regardless_of_contents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".completed");
        let mut store = CompletionStore::open(&path).expect("open");
        store.mark_done("5").expect("mark");

        store.reset_all().expect("reset");
        store.reset_all().expect("reset again");
        assert!(!store.contains("5"));
        assert_eq!(fs::read_to_string(&path).expect("read"), "");
    }

    #[test]
    fn load_tolerates_blank_lines_and_opaque_entries() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".completed");
        fs::write(&path, "12\n\n  \nlegacy-entry\n7\n").expect("seed");

        let store = CompletionStore::open(&path).expect("open");
        assert!(store.contains("12"));
        assert!(store.contains("7"));
        assert!(store.contains("legacy-entry"));
    }
}
