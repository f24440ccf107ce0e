//! Session audit log and the `man` mode report.

use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Size above which the operator is offered to clear the audit log.
pub const AUDIT_LOG_LIMIT: u64 = 1024 * 1024;

/// Append-only record of every command of a session.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    file: Option<File>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Current size on disk, zero when absent.
    pub fn size(&self) -> u64 {
        fs::metadata(&self.path).map(|meta| meta.len()).unwrap_or(0)
    }

    pub fn is_oversized(&self) -> bool {
        self.size() > AUDIT_LOG_LIMIT
    }

    pub fn remove(&self) -> io::Result<()> {
        fs::remove_file(&self.path)
    }

    pub fn open(&mut self) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let now = Local::now();
        writeln!(
            file,
            "<BEG>Session began on {} at {}.",
            now.format("%d/%m/%Y"),
            now.format("%H:%M:%S")
        )?;
        self.file = Some(file);
        Ok(())
    }

    pub fn write(&mut self, text: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let stamp = Local::now().format("%H:%M:%S");
        if let Err(err) = writeln!(file, "[{stamp}]>>> {text}") {
            tracing::warn!(%err, path = %self.path.display(), "audit log write failed");
        }
    }

    pub fn close(&mut self) {
        let Some(mut file) = self.file.take() else {
            return;
        };
        let now = Local::now();
        if let Err(err) = writeln!(
            file,
            "<END>Session ended on {} at {}.",
            now.format("%d/%m/%Y"),
            now.format("%H:%M:%S")
        ) {
            tracing::warn!(%err, "audit log close failed");
        }
    }
}

/// Report file written while `man` mode is active.
#[derive(Debug, Default)]
pub struct ManTranscript {
    file: Option<(PathBuf, File)>,
}

impl ManTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Truncate `path` and start recording into it.
    pub fn open(&mut self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        self.file = Some((path.to_path_buf(), file));
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|(path, _)| path.as_path())
    }

    /// Append `text` as one line; ignored when not recording.
    pub fn write(&mut self, text: &str) {
        if let Some((path, file)) = self.file.as_mut() {
            let line = text.trim_end_matches('\n');
            if let Err(err) = writeln!(file, "{line}") {
                tracing::warn!(%err, path = %path.display(), "man report write failed");
            }
        }
    }

    pub fn close(&mut self) {
        if let Some((path, mut file)) = self.file.take() {
            if let Err(err) = file.flush() {
                tracing::warn!(%err, path = %path.display(), "man report flush failed");
            }
        }
    }
}
