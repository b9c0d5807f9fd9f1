//! Server configuration, read from environment variables.
//!
//! | Variable                 | Default             |
//! |--------------------------|---------------------|
//! | `PORT`                   | `3000`              |
//! | `PETS_BIND_HOST`         | `0.0.0.0`           |
//! | `PETS_DATABASE_PATH`     | `pets.db`           |
//! | `PETS_STORE_TIMEOUT_MS`  | `5000`              |
//! | `PETS_ASSETS_DIR`        | `web`               |
//! | `PETS_LOG_FORMAT`        | `pretty`            |
//! | `PETS_DOG_AGE_INCREMENT` | `read-modify-write` |
//!
//! `PETS_DATABASE_PATH=:memory:` selects a throwaway in-memory store.
//! Malformed values are errors rather than silently replaced by defaults.

use crate::dogs::AgeIncrement;
use crate::logging::LogFormat;
use crate::store::sqlite::{SqliteStore, DEFAULT_TIMEOUT};
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

const MEMORY_DATABASE: &str = ":memory:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_host: String,
    pub port: u16,
    pub database: DatabaseLocation,
    pub store_timeout: Duration,
    pub assets_dir: PathBuf,
    pub log_format: LogFormat,
    pub dog_age_increment: AgeIncrement,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            database: DatabaseLocation::File(PathBuf::from("pets.db")),
            store_timeout: DEFAULT_TIMEOUT,
            assets_dir: PathBuf::from("web"),
            log_format: LogFormat::default(),
            dog_age_increment: AgeIncrement::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(port) = get("PORT") {
            config.port = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got `{port}`"))?;
        }
        if let Some(host) = get("PETS_BIND_HOST") {
            config.bind_host = host;
        }
        if let Some(path) = get("PETS_DATABASE_PATH") {
            config.database = if path == MEMORY_DATABASE {
                DatabaseLocation::Memory
            } else {
                DatabaseLocation::File(PathBuf::from(path))
            };
        }
        if let Some(timeout) = get("PETS_STORE_TIMEOUT_MS") {
            let millis: u64 = timeout.parse().with_context(|| {
                format!("PETS_STORE_TIMEOUT_MS must be milliseconds, got `{timeout}`")
            })?;
            if millis == 0 {
                return Err(anyhow!("PETS_STORE_TIMEOUT_MS must be greater than zero"));
            }
            config.store_timeout = Duration::from_millis(millis);
        }
        if let Some(dir) = get("PETS_ASSETS_DIR") {
            config.assets_dir = PathBuf::from(dir);
        }
        if let Some(format) = get("PETS_LOG_FORMAT") {
            config.log_format = format.parse().map_err(|err: String| anyhow!(err))?;
        }
        if let Some(strategy) = get("PETS_DOG_AGE_INCREMENT") {
            config.dog_age_increment = strategy.parse().map_err(|err: String| anyhow!(err))?;
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    /// Opens the configured document store
    pub fn open_store(&self) -> Result<SqliteStore> {
        let store = match &self.database {
            DatabaseLocation::Memory => SqliteStore::open_in_memory(self.store_timeout)
                .context("failed to open in-memory store")?,
            DatabaseLocation::File(path) => SqliteStore::open(path, self.store_timeout)
                .with_context(|| format!("failed to open store at {}", path.display()))?,
        };
        Ok(store)
    }
}
