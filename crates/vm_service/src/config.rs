use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 50 MiB, the largest encoded payload a single item may carry.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 52_428_800;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("Inconsistent configuration: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub max_payload_size: usize,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub op_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("vaultme.db"),
            max_connections: 8,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            default_page_size: 20,
            max_page_size: 100,
            op_timeout_secs: 10,
        }
    }
}

impl ServiceConfig {
    /// Read `VAULTME_*` variables from the process environment, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            database_path: lookup("VAULTME_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            max_connections: parse(&lookup, "VAULTME_MAX_CONNECTIONS", defaults.max_connections)?,
            max_payload_size: parse(&lookup, "VAULTME_MAX_PAYLOAD_SIZE", defaults.max_payload_size)?,
            default_page_size: parse(&lookup, "VAULTME_DEFAULT_PAGE_SIZE", defaults.default_page_size)?,
            max_page_size: parse(&lookup, "VAULTME_MAX_PAGE_SIZE", defaults.max_page_size)?,
            op_timeout_secs: parse(&lookup, "VAULTME_OP_TIMEOUT_SECS", defaults.op_timeout_secs)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Inconsistent("max_connections must be at least 1".into()));
        }
        if self.max_payload_size == 0 {
            return Err(ConfigError::Inconsistent("max_payload_size must be positive".into()));
        }
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(ConfigError::Inconsistent("page sizes must be positive".into()));
        }
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::Inconsistent(format!(
                "default_page_size {} exceeds max_page_size {}",
                self.default_page_size, self.max_page_size
            )));
        }
        if self.op_timeout_secs == 0 {
            return Err(ConfigError::Inconsistent("op_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_secs(self.op_timeout_secs)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
