use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use viewseed_common::{Error, Result};

/// Database path that selects a private in-memory SQLite database.
pub const IN_MEMORY: &str = ":memory:";

const DEFAULT_DB_FILE: &str = "viewseed.db";

/// Top-level configuration, loaded from `config.yml` or `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub seed: SeedConfig,
    pub log: LogConfig,
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.seed.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`. Unset means `<data_dir>/viewseed.db`.
    pub path: Option<String>,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5_000,
        }
    }
}

impl DatabaseConfig {
    pub fn in_memory() -> Self {
        Self {
            path: Some(IN_MEMORY.to_string()),
            ..Default::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.as_deref() == Some(IN_MEMORY)
    }

    /// The database file to open. Falls back to `viewseed.db` inside `data_dir`.
    pub fn resolve_path(&self, data_dir: &Path) -> PathBuf {
        match &self.path {
            Some(path) => PathBuf::from(path),
            None => data_dir.join(DEFAULT_DB_FILE),
        }
    }
}

/// Shape and randomness of the seeded data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub users: u32,
    pub products_per_user: u32,
    pub min_age: i64,
    pub max_age: i64,
    /// Prices are drawn from `[0, max_price)`.
    pub max_price: f64,
    /// Fixed RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            users: 10,
            products_per_user: 10,
            min_age: 18,
            max_age: 67,
            max_price: 100.0,
            rng_seed: None,
        }
    }
}

impl SeedConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_age > self.max_age {
            return Err(Error::Config(format!(
                "seed.min_age ({}) is greater than seed.max_age ({})",
                self.min_age, self.max_age
            )));
        }
        if !self.max_price.is_finite() || self.max_price <= 0.0 {
            return Err(Error::Config(format!(
                "seed.max_price must be a positive number, got {}",
                self.max_price
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
