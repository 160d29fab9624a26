//! Runtime configuration for the glossary core.
//!
//! # Responsibility
//! - Hold the settings outer layers pass into core: database location,
//!   logging, edit retry bound and search limit.
//! - Apply `GLOSSARY_*` environment overrides on top of defaults.
//!
//! # Invariants
//! - A config that passed `validate()` can be handed to `open_db` and
//!   `init_logging` without further checks.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use crate::service::edit_service::DEFAULT_EDIT_RETRY_LIMIT;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "GLOSSARY_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "GLOSSARY_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "GLOSSARY_LOG_DIR";
pub const ENV_EDIT_RETRY_LIMIT: &str = "GLOSSARY_EDIT_RETRY_LIMIT";
pub const ENV_SEARCH_LIMIT: &str = "GLOSSARY_SEARCH_LIMIT";

const DEFAULT_DB_FILE_NAME: &str = "glossary.sqlite3";

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: &'static str,
    pub message: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid config `{}`: {}", self.key, self.message)
    }
}

impl Error for ConfigError {}

/// Core settings. Missing fields fall back to [`CoreConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file; `None` opens an in-memory database.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute log directory; `None` leaves logging uninitialized.
    pub log_dir: Option<String>,
    /// Attempts per edit when the version sequence race is lost.
    pub edit_retry_limit: u32,
    /// Default cap on search results; `None` returns every match.
    pub search_limit: Option<u32>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: Some(PathBuf::from(DEFAULT_DB_FILE_NAME)),
            log_level: default_log_level().to_string(),
            log_dir: None,
            edit_retry_limit: DEFAULT_EDIT_RETRY_LIMIT,
            search_limit: None,
        }
    }
}

impl CoreConfig {
    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup` (keyed by the `ENV_*` names).
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_DB_PATH) {
            let value = value.trim();
            self.db_path = if value.is_empty() || value == ":memory:" {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.log_level = value;
        }
        if let Some(value) = lookup(ENV_LOG_DIR) {
            self.log_dir = Some(value);
        }
        if let Some(value) = lookup(ENV_EDIT_RETRY_LIMIT) {
            self.edit_retry_limit = parse_u32(ENV_EDIT_RETRY_LIMIT, &value)?;
        }
        if let Some(value) = lookup(ENV_SEARCH_LIMIT) {
            self.search_limit = Some(parse_u32(ENV_SEARCH_LIMIT, &value)?);
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks value ranges and formats.
    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.log_level).map_err(|err| ConfigError {
            key: "log_level",
            message: err.to_string(),
        })?;
        if let Some(log_dir) = self.log_dir.as_deref() {
            normalize_log_dir(log_dir).map_err(|err| ConfigError {
                key: "log_dir",
                message: err.to_string(),
            })?;
        }
        if self.edit_retry_limit == 0 {
            return Err(ConfigError {
                key: "edit_retry_limit",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_u32(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|err| ConfigError {
        key,
        message: format!("`{value}` is not a non-negative integer: {err}"),
    })
}
