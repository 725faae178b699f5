//! Storage configuration.
//!
//! # Environment Variables
//!
//! All optional:
//! - `PHARMACY_DB_PATH` - SQLite file (default: in-memory)
//! - `PHARMACY_BUSY_TIMEOUT_MS` - lock wait per statement (default: 5000)
//! - `PHARMACY_MAX_CONFLICT_RETRIES` - allocation retries on contention (default: 5)
//! - `PHARMACY_WAL` - `true`/`false` (default: true)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// How the SQLite store is opened and how allocations react to contention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file; `None` opens a private in-memory database
    pub path: Option<PathBuf>,
    /// How long a connection waits on a locked database before failing
    pub busy_timeout_ms: u64,
    /// Extra attempts after an allocation hits lock contention
    pub max_conflict_retries: u32,
    /// Use write-ahead logging (file databases only)
    pub wal: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5_000,
            max_conflict_retries: 5,
            wal: true,
        }
    }
}

impl StoreConfig {
    /// File-backed configuration with defaults for everything else.
    pub fn file<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Parse from JSON; missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load from `PHARMACY_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            path: lookup("PHARMACY_DB_PATH")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            busy_timeout_ms: parse_var(&lookup, "PHARMACY_BUSY_TIMEOUT_MS")?
                .unwrap_or(defaults.busy_timeout_ms),
            max_conflict_retries: parse_var(&lookup, "PHARMACY_MAX_CONFLICT_RETRIES")?
                .unwrap_or(defaults.max_conflict_retries),
            wal: parse_var(&lookup, "PHARMACY_WAL")?.unwrap_or(defaults.wal),
        })
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(name.to_string(), e.to_string()))
        })
        .transpose()
}
