//! Store configuration
//!
//! Loaded from TOML; every key is optional:
//!
//! ```toml
//! database_path = "orders.db"
//! busy_timeout_ms = 5000
//! journal_mode = "wal"
//! foreign_keys = true
//! log_profile = "production"
//! ```

use aggrel_core::logging_facility::Profile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Path value selecting an in-memory database
pub const IN_MEMORY: &str = ":memory:";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    #[default]
    Wal,
    Delete,
    Memory,
}

impl JournalMode {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
            JournalMode::Memory => "MEMORY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub database_path: String,
    pub busy_timeout_ms: u64,
    pub journal_mode: JournalMode,
    pub foreign_keys: bool,
    pub log_profile: Profile,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: IN_MEMORY.to_string(),
            busy_timeout_ms: 5000,
            journal_mode: JournalMode::Wal,
            foreign_keys: true,
            log_profile: Profile::Development,
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Default settings for a file-backed database
    pub fn for_path(path: impl AsRef<Path>) -> Self {
        Self {
            database_path: path.as_ref().to_string_lossy().into_owned(),
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == IN_MEMORY
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: StoreConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`StoreConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "database_path",
                reason: "must not be empty".to_string(),
            });
        }
        if self.busy_timeout_ms > u64::from(u32::MAX) {
            return Err(ConfigError::Invalid {
                key: "busy_timeout_ms",
                reason: format!("{} exceeds {}", self.busy_timeout_ms, u32::MAX),
            });
        }
        Ok(())
    }
}
