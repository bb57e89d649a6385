//! Application configuration
//!
//! Values come from environment variables prefixed `BABY_TRACKER__`, nested
//! with `__` (for example `BABY_TRACKER__DATABASE__MAX_CONNECTIONS=20`). A
//! `.env` file in the working directory is loaded first when present. Every
//! field has a default, so an empty environment yields a usable local setup.

use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;

use core_kernel::RetryPolicy;
use infra_db::{DatabaseConfig, TransactionIsolation};

use crate::error::BootstrapError;

/// Prefix shared by every configuration variable
pub const ENV_PREFIX: &str = "BABY_TRACKER";
const ENV_SEPARATOR: &str = "__";

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Connection pool settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub idle_timeout_secs: u64,
    /// Open connections on first use instead of at startup
    pub lazy: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let defaults = DatabaseConfig::default();
        Self {
            url: defaults.url,
            max_connections: defaults.max_connections,
            min_connections: defaults.min_connections,
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            max_lifetime_secs: defaults.max_lifetime.as_secs(),
            idle_timeout_secs: defaults.idle_timeout.as_secs(),
            lazy: false,
        }
    }
}

impl DatabaseSettings {
    pub fn to_database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.url.clone())
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .max_lifetime(Duration::from_secs(self.max_lifetime_secs))
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    /// Retries for transactions that fail transiently
    pub retry: RetryPolicy,
    /// Isolation level of every coordinator transaction
    pub isolation: TransactionIsolation,
    /// Fallback filter when `RUST_LOG` is unset
    pub log_level: String,
    pub log_format: LogFormat,
    /// Apply embedded migrations during startup
    pub run_migrations: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseSettings::default(),
            retry: RetryPolicy::default(),
            isolation: TransactionIsolation::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            run_migrations: true,
        }
    }
}

impl AppConfig {
    /// Loads configuration from `.env` and the process environment
    pub fn from_env() -> Result<Self, BootstrapError> {
        dotenvy::dotenv().ok();
        Self::from_environment(environment())
    }

    /// Loads configuration from an explicit environment source
    pub fn from_environment(source: Environment) -> Result<Self, BootstrapError> {
        let config = Config::builder().add_source(source).build()?.try_deserialize()?;
        Ok(config)
    }
}

/// Environment source with this application's prefix and nesting rules
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}
