//! Client configuration.
//!
//! Defaults can be overridden from a TOML file and then from
//! `GRIDLOCK_*` environment variables.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Grid client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Base URL of the grid server
    pub server_url: String,
    /// Default store (bare id or share link)
    pub store: Option<String>,
    /// Default lock-holder identity
    pub identity: Option<String>,
    /// Total time to wait for a table lock in milliseconds
    pub lock_timeout_ms: u64,
    /// Sleep between lock cell reads in milliseconds
    pub lock_poll_interval_ms: u64,
    /// Transport timeout per remote call in milliseconds
    pub request_timeout_ms: u64,
    /// Row count for newly provisioned tables
    pub provision_rows: u32,
    /// Column count for newly provisioned tables
    pub provision_cols: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            store: None,
            identity: None,
            lock_timeout_ms: 10_000,
            lock_poll_interval_ms: 500,
            request_timeout_ms: 5000,
            provision_rows: 1000,
            provision_cols: 20,
        }
    }
}

impl GridConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            GridError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| GridError::ConfigError(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `GRIDLOCK_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = env::var("GRIDLOCK_SERVER_URL") {
            self.server_url = url;
        }
        if let Ok(store) = env::var("GRIDLOCK_STORE") {
            self.store = Some(store);
        }
        if let Ok(identity) = env::var("GRIDLOCK_IDENTITY") {
            self.identity = Some(identity);
        }
        if let Some(ms) = env_u64("GRIDLOCK_LOCK_TIMEOUT_MS")? {
            self.lock_timeout_ms = ms;
        }
        if let Some(ms) = env_u64("GRIDLOCK_LOCK_POLL_INTERVAL_MS")? {
            self.lock_poll_interval_ms = ms;
        }
        if let Some(ms) = env_u64("GRIDLOCK_REQUEST_TIMEOUT_MS")? {
            self.request_timeout_ms = ms;
        }
        self.validate()
    }

    /// Rejects settings the lock loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.lock_poll_interval_ms == 0 {
            return Err(GridError::ConfigError(
                "lock_poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.provision_cols == 0 || self.provision_rows == 0 {
            return Err(GridError::ConfigError(
                "provisioned tables need at least one row and one column".to_string(),
            ));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn lock_poll_interval(&self) -> Duration {
        Duration::from_millis(self.lock_poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| GridError::ConfigError(format!("{} must be an integer: {}", name, e))),
        Err(_) => Ok(None),
    }
}
