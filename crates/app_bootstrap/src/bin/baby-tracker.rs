//! Baby Tracker - event store process
//!
//! Brings the event store up, keeps it running until the process is asked to
//! stop, then closes the pool.
//!
//! # Usage
//!
//! ```bash
//! # Run against a local database with defaults
//! cargo run --bin baby-tracker
//!
//! # Override settings through the environment
//! BABY_TRACKER__DATABASE__URL=postgres://... BABY_TRACKER__LOG_FORMAT=json cargo run --bin baby-tracker
//! ```
//!
//! # Environment Variables
//!
//! * `BABY_TRACKER__DATABASE__URL` - PostgreSQL connection string
//! * `BABY_TRACKER__DATABASE__MAX_CONNECTIONS` - Pool size (default: 10)
//! * `BABY_TRACKER__ISOLATION` - `read_committed`, `repeatable_read` or `serializable`
//! * `BABY_TRACKER__RETRY__MAX_RETRIES` - Retries for transient failures (default: 3)
//! * `BABY_TRACKER__LOG_LEVEL` - Used when `RUST_LOG` is unset (default: info)
//! * `BABY_TRACKER__LOG_FORMAT` - `pretty` or `json`
//! * `BABY_TRACKER__RUN_MIGRATIONS` - Apply migrations on start (default: true)

use anyhow::Context;
use app_bootstrap::{init_tracing, AppConfig, Application};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("loading configuration")?;

    init_tracing(&config.log_level, config.log_format)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_format = ?config.log_format,
        "Starting baby tracker"
    );

    let app = Application::init(config)
        .await
        .context("initialising the event store")?;

    shutdown_signal().await;

    app.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
