//! # Config - Environment Configuration
//!
//! Settings for tools that open a record dataset, read from environment
//! variables with defaults:
//!
//! ```text
//! RECORDSTORE_LOG_PATH        record-log path               (default: "data/records.bin")
//! RECORDSTORE_INDEX_PATH      index path                    (default: log path with ".idx")
//! RECORDSTORE_ARITY           fields per record             (default: 1)
//! RECORDSTORE_RESET_ON_EMPTY  recreate the log on append
//!                             when the index is empty       (default: "false")
//! ```
//!
//! Unparseable numbers and booleans fall back to their defaults. An arity of
//! zero is rejected because a record must hold at least one field.

use std::path::PathBuf;
use thiserror::Error;

pub const ENV_LOG_PATH: &str = "RECORDSTORE_LOG_PATH";
pub const ENV_INDEX_PATH: &str = "RECORDSTORE_INDEX_PATH";
pub const ENV_ARITY: &str = "RECORDSTORE_ARITY";
pub const ENV_RESET_ON_EMPTY: &str = "RECORDSTORE_RESET_ON_EMPTY";

pub const DEFAULT_LOG_PATH: &str = "data/records.bin";
pub const DEFAULT_ARITY: usize = 1;

/// Errors produced while loading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `RECORDSTORE_ARITY` was set to 0.
    #[error("RECORDSTORE_ARITY must be at least 1")]
    ZeroArity,
}

/// Where a dataset lives and how it is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetConfig {
    /// Record-log path.
    pub log_path: PathBuf,
    /// Explicit index path; `None` means the default next to the log.
    pub index_path: Option<PathBuf>,
    /// Number of fields per record.
    pub arity: usize,
    /// Opt into recreating the log when appending to an empty index.
    pub reset_on_empty_index: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            index_path: None,
            arity: DEFAULT_ARITY,
            reset_on_empty_index: false,
        }
    }
}

impl DatasetConfig {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `lookup`, which maps a variable name to
    /// its value. Lets tests supply variables without touching the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let log_path = lookup(ENV_LOG_PATH)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.log_path);
        let index_path = lookup(ENV_INDEX_PATH)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        let arity = lookup(ENV_ARITY)
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(defaults.arity);
        let reset_on_empty_index = lookup(ENV_RESET_ON_EMPTY)
            .and_then(|s| s.trim().parse::<bool>().ok())
            .unwrap_or(defaults.reset_on_empty_index);

        if arity == 0 {
            return Err(ConfigError::ZeroArity);
        }

        Ok(Self {
            log_path,
            index_path,
            arity,
            reset_on_empty_index,
        })
    }
}
