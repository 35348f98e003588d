//! Typed engine configuration from environment variables.
//!
//! # Responsibility
//! - Load database, logging and lending policy settings once at startup.
//! - Fail fast on malformed values instead of silently falling back.
//!
//! # Invariants
//! - Unset optional variables resolve to documented defaults.
//! - Set-but-invalid variables are always an error.

use crate::db::DEFAULT_BUSY_TIMEOUT;
use crate::logging::default_log_level;
use crate::service::borrow_service::DEFAULT_LOAN_PERIOD_DAYS;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "LENDING_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "LENDING_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "LENDING_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "LENDING_BUSY_TIMEOUT_MS";
pub const ENV_LOAN_PERIOD_DAYS: &str = "LENDING_LOAN_PERIOD_DAYS";

const DEFAULT_DB_FILE_NAME: &str = "lending.sqlite3";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable is set but cannot be parsed.
    InvalidValue {
        var: &'static str,
        value: String,
        message: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                var,
                value,
                message,
            } => write!(f, "invalid value `{value}` for {var}: {message}"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LendingConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Rolling log directory. File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    /// How long a writer waits for another connection's write lock.
    pub busy_timeout: Duration,
    /// Loan length granted on approval.
    pub loan_period_days: u32,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
        }
    }
}

impl LendingConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let log_level = match var(ENV_LOG_LEVEL) {
            Some(value) => normalize_level(&value)?,
            None => defaults.log_level,
        };

        let log_dir = match var(ENV_LOG_DIR) {
            Some(value) => {
                let path = PathBuf::from(value.trim());
                if !path.is_absolute() {
                    return Err(ConfigError::InvalidValue {
                        var: ENV_LOG_DIR,
                        value,
                        message: "must be an absolute path",
                    });
                }
                Some(path)
            }
            None => None,
        };

        let busy_timeout = match var(ENV_BUSY_TIMEOUT_MS) {
            Some(value) => Duration::from_millis(parse_number(ENV_BUSY_TIMEOUT_MS, value)?),
            None => defaults.busy_timeout,
        };

        let loan_period_days = match var(ENV_LOAN_PERIOD_DAYS) {
            Some(value) => {
                let days: u32 = parse_number(ENV_LOAN_PERIOD_DAYS, value.clone())?;
                if days == 0 {
                    return Err(ConfigError::InvalidValue {
                        var: ENV_LOAN_PERIOD_DAYS,
                        value,
                        message: "must be at least one day",
                    });
                }
                days
            }
            None => defaults.loan_period_days,
        };

        Ok(Self {
            db_path: var(ENV_DB_PATH).map_or(defaults.db_path, PathBuf::from),
            log_level,
            log_dir,
            busy_timeout,
            loan_period_days,
        })
    }
}

fn normalize_level(value: &str) -> ConfigResult<String> {
    match value.trim().to_ascii_lowercase().as_str() {
        level @ ("trace" | "debug" | "info" | "warn" | "error") => Ok(level.to_string()),
        "warning" => Ok("warn".to_string()),
        _ => Err(ConfigError::InvalidValue {
            var: ENV_LOG_LEVEL,
            value: value.to_string(),
            message: "expected trace|debug|info|warn|error",
        }),
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: String) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            var,
            value,
            message: "expected a non-negative integer",
        })
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, LendingConfig, ENV_LOAN_PERIOD_DAYS, ENV_LOG_DIR};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = LendingConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LendingConfig::default());
        assert_eq!(config.loan_period_days, 14);
    }

    #[test]
    fn values_are_parsed_and_normalized() {
        let config = LendingConfig::from_lookup(lookup(&[
            ("LENDING_DB_PATH", "/var/lib/lending/db.sqlite3"),
            ("LENDING_LOG_LEVEL", " WARNING "),
            ("LENDING_LOG_DIR", "/var/log/lending"),
            ("LENDING_BUSY_TIMEOUT_MS", "250"),
            ("LENDING_LOAN_PERIOD_DAYS", "21"),
        ]))
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/var/lib/lending/db.sqlite3"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/lending")));
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.loan_period_days, 21);
    }

    #[test]
    fn invalid_values_fail_fast() {
        let err = LendingConfig::from_lookup(lookup(&[("LENDING_LOG_DIR", "logs")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var, .. } if var == ENV_LOG_DIR));

        let err =
            LendingConfig::from_lookup(lookup(&[("LENDING_LOAN_PERIOD_DAYS", "0")])).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { var, .. } if var == ENV_LOAN_PERIOD_DAYS)
        );

        assert!(LendingConfig::from_lookup(lookup(&[("LENDING_LOG_LEVEL", "loud")])).is_err());
        assert!(
            LendingConfig::from_lookup(lookup(&[("LENDING_BUSY_TIMEOUT_MS", "-1")])).is_err()
        );
    }
}
