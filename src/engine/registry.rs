//! Lookup table of built-in administrative commands.

use super::CommandEngine;
use crate::error::Failure;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Arguments of one built-in command.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub name: String,
    /// Lower-cased arguments.
    pub args: Vec<String>,
    /// Arguments with their original letter case, for file names.
    pub original_args: Vec<String>,
    /// The whole trimmed command line.
    pub text: String,
}

/// What the engine does once a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Continue without the trailing blank line.
    Quiet,
    Exit,
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &str;

    fn summary(&self) -> &str;

    fn handle(
        &self,
        engine: &mut CommandEngine,
        invocation: &CommandInvocation,
    ) -> Result<Flow, Failure>;
}

#[derive(Default)]
pub struct Registry {
    builtins: RwLock<HashMap<String, Arc<dyn CommandHandler>>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("builtins", &self.all_commands())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_builtin(&self, name: &str, handler: Arc<dyn CommandHandler>) {
        self.builtins.write().insert(name.to_string(), handler);
    }

    /// Handler for an already lower-cased command name.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.builtins.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builtins.read().contains_key(name)
    }

    /// Sorted command names.
    pub fn all_commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self.builtins.read().keys().cloned().collect();
        names.sort();
        names
    }
}
