//! Persistent command history for the interactive prompt.

use anyhow::Context;
use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Entries kept when no explicit limit is configured.
pub const DEFAULT_LIMIT: usize = 1000;

/// Manages command history persistence and de-duplication.
#[derive(Debug)]
pub struct HistoryManager {
    path: PathBuf,
    limit: usize,
    entries: VecDeque<String>,
}

impl HistoryManager {
    /// Read `path` if it exists, keeping at most `limit` recent entries.
    pub fn load(path: impl Into<PathBuf>, limit: usize) -> anyhow::Result<Self> {
        let mut manager = Self::with_path(path, limit);
        if manager.path.exists() {
            let file = OpenOptions::new()
                .read(true)
                .open(&manager.path)
                .with_context(|| format!("opening history file {}", manager.path.display()))?;
            for line in BufReader::new(file)
                .lines()
                .map_while(std::result::Result::ok)
            {
                manager.add(&line);
            }
        }
        Ok(manager)
    }

    pub fn with_path(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit: limit.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Append an entry while skipping blanks and consecutive duplicates.
    pub fn add(&mut self, entry: &str) {
        if entry.trim().is_empty() {
            return;
        }
        if self.entries.back().is_some_and(|last| last == entry) {
            return;
        }
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.to_string());
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating history directory {}", dir.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .with_context(|| format!("opening history file {}", self.path.display()))?;
        for line in &self.entries {
            writeln!(file, "{line}")?;
        }
        Ok(())
    }

    pub fn entries(&self) -> impl Iterator<Item = &String> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&String> {
        self.entries.back()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduplicates_consecutive_entries() {
        let mut history = HistoryManager::with_path("/tmp/aitess_history_test", DEFAULT_LIMIT);
        history.add("print 1");
        history.add("print 1");
        history.add("   ");
        history.add("print 2");
        let collected: Vec<_> = history.entries().cloned().collect();
        assert_eq!(collected, vec!["print 1", "print 2"]);
    }

    #[test]
    fn reload_honours_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".aitess_history");
        let mut history = HistoryManager::with_path(&path, 10);
        for n in 0..5 {
            history.add(&format!("print {n}"));
        }
        history.save().unwrap();

        let reloaded = HistoryManager::load(&path, 3).unwrap();
        let collected: Vec<_> = reloaded.entries().cloned().collect();
        assert_eq!(collected, vec!["print 2", "print 3", "print 4"]);
        assert_eq!(reloaded.last().map(String::as_str), Some("print 4"));
    }
}
