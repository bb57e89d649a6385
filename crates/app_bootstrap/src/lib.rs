//! Process lifecycle for the baby tracker
//!
//! Wires the layers together in one place:
//!
//! ```text
//! AppConfig -> DatabasePool -> CompositionCoordinator -> PostgresEventStore -> EventService
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use app_bootstrap::{AppConfig, Application};
//!
//! let app = Application::init(AppConfig::from_env()?).await?;
//! let created = app.service().create_event(&ctx, request).await?;
//! app.shutdown().await;
//! ```

pub mod config;
pub mod error;
pub mod telemetry;

use std::sync::Arc;

use tracing::{info, warn};

use domain_events::EventService;
use infra_db::{
    close_pool, create_lazy_pool, create_pool, run_migrations, CompositionCoordinator,
    DatabasePool, PostgresEventStore,
};

pub use config::{AppConfig, DatabaseSettings, LogFormat};
pub use error::BootstrapError;
pub use telemetry::init_tracing;

/// A running event store with its pool
///
/// Created by [`Application::init`] and torn down by [`Application::shutdown`].
pub struct Application {
    config: AppConfig,
    pool: DatabasePool,
    service: EventService,
}

impl Application {
    /// Creates the pool, applies migrations and checks the store is reachable
    ///
    /// # Errors
    ///
    /// - `Database` if the pool cannot connect or a migration fails
    /// - `Unhealthy` if the startup health check fails; the pool is closed
    pub async fn init(config: AppConfig) -> Result<Self, BootstrapError> {
        let database = config.database.to_database_config();
        let pool = if config.database.lazy {
            create_lazy_pool(&database)?
        } else {
            create_pool(database).await?
        };

        if config.run_migrations {
            if let Err(e) = run_migrations(&pool).await {
                close_pool(&pool).await;
                return Err(e.into());
            }
        }

        let coordinator = CompositionCoordinator::new(pool.clone())
            .with_retry_policy(config.retry)
            .with_isolation(config.isolation);
        let service = EventService::new(Arc::new(PostgresEventStore::new(coordinator)));

        let health = service.health_check().await;
        if !health.is_healthy() {
            let reason = health
                .message
                .unwrap_or_else(|| format!("{} reported {:?}", health.adapter_id, health.status));
            warn!(%reason, "Startup health check failed");
            close_pool(&pool).await;
            return Err(BootstrapError::Unhealthy(reason));
        }

        info!(
            isolation = %config.isolation,
            max_retries = config.retry.max_retries,
            latency_ms = health.latency_ms,
            "Event store ready"
        );

        Ok(Self {
            config,
            pool,
            service,
        })
    }

    /// The event service backed by this application's pool
    pub fn service(&self) -> &EventService {
        &self.service
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Closes the pool, waiting for checked-out connections to return
    pub async fn shutdown(self) {
        close_pool(&self.pool).await;
        info!("Event store shut down");
    }
}
