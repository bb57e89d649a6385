//! Startup and shutdown errors

use thiserror::Error;

use infra_db::DatabaseError;

/// Errors that stop the process from coming up
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration could not be read or deserialized
    #[error("Invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    /// The pool could not be created or migrations failed
    #[error("Database initialisation failed: {0}")]
    Database(#[from] DatabaseError),

    /// The store answered its startup health check as unhealthy
    #[error("Event store is unhealthy: {0}")]
    Unhealthy(String),

    /// A global tracing subscriber was already installed
    #[error("Failed to initialise tracing: {0}")]
    Telemetry(String),
}
