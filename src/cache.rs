//! Snapshot of the symbol table used to skip re-executing the configuration.
//!
//! The runtime version is a field of the table itself, so a snapshot is
//! decoded in full before its version can be compared.

use crate::symbol::SymbolTable;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("unable to read cache file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to write cache file '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cache file '{}' is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("unable to encode symbol table: {0}")]
    Encode(String),
}

/// Result of reading a snapshot.
#[derive(Debug)]
pub enum CacheLoad {
    /// Written by this runtime version.
    Fresh(SymbolTable),
    /// Written by another version; must be rebuilt.
    Stale { found: String },
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
    version: String,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Stamp `table` with the running version and write it out.
    ///
    /// The snapshot is written beside the target and renamed into place so a
    /// failed write never leaves a truncated cache behind.
    pub fn save(&self, table: &mut SymbolTable) -> Result<(), CacheError> {
        table.update_cache_version(self.version.clone());
        let bytes = bincode::serialize(table).map_err(|err| CacheError::Encode(err.to_string()))?;
        let staging = self.path.with_extension("cache.tmp");
        let write_error = |source| CacheError::Write {
            path: self.path.clone(),
            source,
        };
        fs::write(&staging, bytes).map_err(write_error)?;
        fs::rename(&staging, &self.path).map_err(write_error)?;
        tracing::debug!(path = %self.path.display(), entries = table.len(), "cache saved");
        Ok(())
    }

    /// Decode the snapshot, then compare its embedded version.
    pub fn load(&self) -> Result<CacheLoad, CacheError> {
        let bytes = fs::read(&self.path).map_err(|source| CacheError::Read {
            path: self.path.clone(),
            source,
        })?;
        let table: SymbolTable =
            bincode::deserialize(&bytes).map_err(|err| CacheError::Corrupt {
                path: self.path.clone(),
                reason: err.to_string(),
            })?;
        if table.cache_version() != self.version {
            tracing::info!(
                found = table.cache_version(),
                expected = %self.version,
                "cache version mismatch"
            );
            return Ok(CacheLoad::Stale {
                found: table.cache_version().to_string(),
            });
        }
        Ok(CacheLoad::Fresh(table))
    }

    /// Delete the snapshot; a missing file is not an error.
    pub fn remove(&self) -> Result<(), CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CacheError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
