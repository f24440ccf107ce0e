//! Operator preferences loaded from `settings.toml`.

use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Prompt shown before each interactive command.
    pub prompt: String,
    /// Entries kept in the persisted history.
    pub history_limit: usize,
    /// Initial state of the startup/reload progress indicator.
    pub progress_animation: bool,
    pub high_priority: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prompt: ">>> ".to_string(),
            history_limit: 1000,
            progress_animation: true,
            high_priority: false,
        }
    }
}

impl Settings {
    /// Load from the platform configuration directory, or defaults when absent.
    pub fn load() -> anyhow::Result<(Self, PathBuf)> {
        let dirs = ProjectDirs::from("in", "ADE", "aitess")
            .ok_or_else(|| anyhow::anyhow!("unable to determine configuration directory"))?;
        let path = dirs.config_dir().join(SETTINGS_FILE);
        let settings = Self::load_from(&path)?;
        Ok((settings, path))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("parsing settings {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("creating settings directory")?;
        }
        let serialized = toml::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("writing settings to {}", path.display()))?;
        Ok(())
    }
}
