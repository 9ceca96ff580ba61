//! Environment-driven runtime configuration.
//!
//! # Responsibility
//! - Resolve store path, log level/directory and timer periods for hosts.
//!
//! # Invariants
//! - Blank environment values are treated as unset.

use crate::logging::default_log_level;
use crate::schedule::{MIDNIGHT_INTERVAL, REMINDER_INTERVAL, ROLLOVER_INTERVAL};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "STEPLER_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "STEPLER_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "STEPLER_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "stepler_data.sqlite3";

/// Resolved configuration for one host process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Logging stays off when unset.
    pub log_dir: Option<String>,
    pub rollover_interval: Duration,
    pub reminder_interval: Duration,
    pub midnight_interval: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            rollover_interval: ROLLOVER_INTERVAL,
            reminder_interval: REMINDER_INTERVAL,
            midnight_interval: MIDNIGHT_INTERVAL,
        }
    }
}

impl CoreConfig {
    /// Reads `STEPLER_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = read(ENV_LOG_DIR);
        config
    }
}
