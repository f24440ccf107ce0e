//! Fixed file locations used by a session.

use directories::BaseDirs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.dat";
pub const CACHE_FILE: &str = "config.cache";
pub const AUDIT_LOG_FILE: &str = "aitess.log";
pub const HISTORY_FILE: &str = ".aitess_history";
pub const SYSTEM_STARTUP_FILE: &str = "startup.tpf";
pub const USER_STARTUP_FILE: &str = ".aitess_startup.tpf";
/// Report name for `man`, resolved through the RDF directory.
pub const MAN_REPORT_FILE: &str = "man.rdf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub config_file: PathBuf,
    pub cache_file: PathBuf,
    pub audit_log: PathBuf,
    pub history_file: PathBuf,
    pub system_startup: PathBuf,
    pub user_startup: PathBuf,
}

impl RuntimePaths {
    /// Locations relative to the current directory and the user's home.
    pub fn discover() -> Self {
        let work = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let home = BaseDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .unwrap_or_else(|| work.clone());
        Self::rooted(&work, &home)
    }

    pub fn rooted(work: &Path, home: &Path) -> Self {
        Self {
            config_file: work.join(CONFIG_FILE),
            cache_file: work.join(CACHE_FILE),
            audit_log: work.join(AUDIT_LOG_FILE),
            history_file: home.join(HISTORY_FILE),
            system_startup: work.join(SYSTEM_STARTUP_FILE),
            user_startup: home.join(USER_STARTUP_FILE),
        }
    }

    /// Use `config_file` and keep the cache beside it.
    pub fn with_config_file(mut self, config_file: impl Into<PathBuf>) -> Self {
        self.config_file = config_file.into();
        self.cache_file = self
            .config_file
            .parent()
            .map(|dir| dir.join(CACHE_FILE))
            .unwrap_or_else(|| PathBuf::from(CACHE_FILE));
        self
    }

    pub fn config_file_name(&self) -> String {
        self.config_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| CONFIG_FILE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_follows_config_override() {
        let paths = RuntimePaths::rooted(Path::new("/work"), Path::new("/home/op"))
            .with_config_file("/etc/aitess/bench.dat");
        assert_eq!(paths.cache_file, PathBuf::from("/etc/aitess/config.cache"));
        assert_eq!(paths.history_file, PathBuf::from("/home/op/.aitess_history"));
        assert_eq!(paths.config_file_name(), "bench.dat");
    }
}
