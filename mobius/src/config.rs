//! Dataset configuration.
//!
//! A [`DatasetConfig`] can be built in code or loaded from a JSON file:
//!
//! ```json
//! {
//!   "path": "/var/lib/mobius",
//!   "read_only": false,
//!   "store_zeroes": true,
//!   "sync_writes": false,
//!   "syntax": { "delimiter": ":", "separator": "," }
//! }
//! ```
//!
//! Every field except `path` may be omitted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::metric::NameSyntax;

/// Options controlling how a [`crate::Dataset`] is opened and written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Directory holding the engine files.
    pub path: PathBuf,
    /// Reject every mutation and never touch the directory.
    pub read_only: bool,
    /// Persist points whose value is exactly zero. When false they are
    /// skipped on write.
    pub store_zeroes: bool,
    /// Fsync the journal after every mutation.
    pub sync_writes: bool,
    /// Name syntax used to parse patterns and render unique names.
    pub syntax: NameSyntax,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            read_only: false,
            store_zeroes: true,
            sync_writes: false,
            syntax: NameSyntax::default(),
        }
    }
}

impl DatasetConfig {
    /// Creates a writable configuration for `path` with default options.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Sets the read-only flag.
    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Sets whether zero values are stored.
    #[must_use]
    pub fn store_zeroes(mut self, store_zeroes: bool) -> Self {
        self.store_zeroes = store_zeroes;
        self
    }

    /// Sets whether each journal record is fsynced.
    #[must_use]
    pub fn sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    /// Sets the name syntax.
    #[must_use]
    pub fn syntax(mut self, syntax: NameSyntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyPath`] if no path is set, or
    /// [`ConfigError::InvalidSyntax`] if the name syntax is unusable.
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath.into());
        }
        self.syntax.validate()?;
        Ok(())
    }

    /// Loads and validates a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`] if the file
    /// cannot be read or decoded, or any error from [`Self::validate`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }
}
