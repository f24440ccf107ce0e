//! State shared by the engine, the built-in commands and the front end.

use super::mode::ModeState;
use crate::config::ConfigStore;
use crate::frontend::OutputQueue;
use crate::paths::RuntimePaths;
use crate::source::SourceStack;
use crate::symbol::SymbolTable;
use crate::transcript::{AuditLog, ManTranscript};
use std::path::PathBuf;

#[derive(Debug)]
pub struct Session {
    /// Absent only before the first successful load.
    pub config: Option<ConfigStore>,
    pub symbols: SymbolTable,
    pub sources: SourceStack,
    pub output: OutputQueue,
    pub modes: ModeState,
    pub audit: AuditLog,
    pub man: ManTranscript,
    pub paths: RuntimePaths,
    /// Whether non-forced results are printed.
    pub display_state: bool,
    /// Whether commands are written to the audit log.
    pub logging_state: bool,
    pub high_priority: bool,
    /// Report file named by the command in progress.
    pub rdf_filename: String,
}

impl Session {
    pub fn new(paths: RuntimePaths) -> Self {
        Self {
            config: None,
            symbols: SymbolTable::new(),
            sources: SourceStack::new(),
            output: OutputQueue::new(),
            modes: ModeState::default(),
            audit: AuditLog::new(paths.audit_log.clone()),
            man: ManTranscript::new(),
            paths,
            display_state: true,
            logging_state: true,
            high_priority: false,
            rdf_filename: String::new(),
        }
    }

    /// Configuration value, empty when nothing is loaded.
    pub fn config_value(&self, option: &str) -> String {
        self.config
            .as_ref()
            .map(|config| config.value(option))
            .unwrap_or_default()
    }

    pub fn resolve_tpf_path(&self, filename: &str) -> PathBuf {
        match &self.config {
            Some(config) => config.resolve_tpf_path(filename),
            None => PathBuf::from(filename),
        }
    }

    pub fn resolve_rdf_path(&self, filename: &str) -> PathBuf {
        match &self.config {
            Some(config) => config.resolve_rdf_path(filename),
            None => PathBuf::from(filename),
        }
    }

    /// Copy a statement listing into the `man` report when recording.
    pub fn record_listing(&mut self, listing: &str) {
        if self.man.is_open() && !listing.trim().is_empty() {
            self.man.write(listing);
        }
    }

    /// Write a typed command to the `man` report and the audit log.
    pub fn record_command(&mut self, text: &str) {
        self.man.write(text);
        if self.logging_state {
            self.audit.write(text);
        }
    }
}
