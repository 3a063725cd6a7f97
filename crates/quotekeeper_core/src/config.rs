//! Runtime configuration sourced from environment variables.
//!
//! # Responsibility
//! - Resolve storage, logging and sync settings with documented defaults.
//! - Reject unparseable or zero-valued durations instead of guessing.
//!
//! # Invariants
//! - Lookups go through one function, so tests never mutate process env.

use crate::logging::default_log_level;
use crate::sync::reconciler::{DEFAULT_FETCH_TIMEOUT, DEFAULT_SYNC_INTERVAL};
use crate::sync::remote::DEFAULT_REMOTE_LIMIT;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable names.
pub mod env_vars {
    pub const DB_PATH: &str = "QUOTEKEEPER_DB_PATH";
    pub const LOG_DIR: &str = "QUOTEKEEPER_LOG_DIR";
    pub const LOG_LEVEL: &str = "QUOTEKEEPER_LOG_LEVEL";
    pub const REMOTE_URL: &str = "QUOTEKEEPER_REMOTE_URL";
    pub const SYNC_INTERVAL_SECS: &str = "QUOTEKEEPER_SYNC_INTERVAL_SECS";
    pub const FETCH_TIMEOUT_SECS: &str = "QUOTEKEEPER_FETCH_TIMEOUT_SECS";
    pub const REMOTE_LIMIT: &str = "QUOTEKEEPER_REMOTE_LIMIT";
}

/// Default values.
pub mod defaults {
    pub const DB_PATH: &str = "./quotekeeper.sqlite3";
    pub const REMOTE_URL: &str = "https://jsonplaceholder.typicode.com/posts";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidNumber { var: &'static str, value: String },
    ZeroValue(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber { var, value } => {
                write!(f, "{var} must be a non-negative integer, got `{value}`")
            }
            Self::ZeroValue(var) => write!(f, "{var} must be greater than zero"),
        }
    }
}

impl Error for ConfigError {}

/// Resolved settings for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteKeeperConfig {
    pub db_path: PathBuf,
    /// `None` logs to stderr instead of rolling files.
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    pub remote_url: String,
    pub sync_interval: Duration,
    pub fetch_timeout: Duration,
    pub remote_limit: usize,
}

impl Default for QuoteKeeperConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(defaults::DB_PATH),
            log_dir: None,
            log_level: default_log_level().to_string(),
            remote_url: defaults::REMOTE_URL.to_string(),
            sync_interval: DEFAULT_SYNC_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            remote_limit: DEFAULT_REMOTE_LIMIT,
        }
    }
}

impl QuoteKeeperConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = get(env_vars::DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        config.log_dir = get(env_vars::LOG_DIR).map(PathBuf::from);
        if let Some(level) = get(env_vars::LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(url) = get(env_vars::REMOTE_URL) {
            config.remote_url = url;
        }
        if let Some(value) = get(env_vars::SYNC_INTERVAL_SECS) {
            config.sync_interval =
                Duration::from_secs(parse_positive(env_vars::SYNC_INTERVAL_SECS, &value)?);
        }
        if let Some(value) = get(env_vars::FETCH_TIMEOUT_SECS) {
            config.fetch_timeout =
                Duration::from_secs(parse_positive(env_vars::FETCH_TIMEOUT_SECS, &value)?);
        }
        if let Some(value) = get(env_vars::REMOTE_LIMIT) {
            let limit = parse_positive(env_vars::REMOTE_LIMIT, &value)?;
            config.remote_limit = usize::try_from(limit).unwrap_or(usize::MAX);
        }

        Ok(config)
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    let parsed = value
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        })?;
    if parsed == 0 {
        return Err(ConfigError::ZeroValue(var));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::{env_vars, ConfigError, QuoteKeeperConfig};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<QuoteKeeperConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        QuoteKeeperConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(from_pairs(&[]).unwrap(), QuoteKeeperConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = from_pairs(&[
            (env_vars::DB_PATH, "/tmp/q.db"),
            (env_vars::LOG_DIR, "/tmp/logs"),
            (env_vars::SYNC_INTERVAL_SECS, "5"),
            (env_vars::FETCH_TIMEOUT_SECS, "2"),
            (env_vars::REMOTE_LIMIT, "20"),
            (env_vars::REMOTE_URL, "http://127.0.0.1:9000/posts"),
        ])
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/q.db"));
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(config.sync_interval, Duration::from_secs(5));
        assert_eq!(config.fetch_timeout, Duration::from_secs(2));
        assert_eq!(config.remote_limit, 20);
        assert_eq!(config.remote_url, "http://127.0.0.1:9000/posts");
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = from_pairs(&[(env_vars::LOG_DIR, "   ")]).unwrap();
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn rejects_invalid_and_zero_numbers() {
        assert_eq!(
            from_pairs(&[(env_vars::SYNC_INTERVAL_SECS, "soon")]).unwrap_err(),
            ConfigError::InvalidNumber {
                var: env_vars::SYNC_INTERVAL_SECS,
                value: "soon".to_string(),
            }
        );
        assert_eq!(
            from_pairs(&[(env_vars::FETCH_TIMEOUT_SECS, "0")]).unwrap_err(),
            ConfigError::ZeroValue(env_vars::FETCH_TIMEOUT_SECS)
        );
    }
}
