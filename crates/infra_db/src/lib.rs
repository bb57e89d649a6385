//! Infrastructure Database Layer
//!
//! This crate provides the PostgreSQL infrastructure for the baby tracker,
//! built on SQLx.
//!
//! # Architecture
//!
//! - [`pool`]: connection pool creation and shutdown
//! - [`migrations`]: embedded schema migrations
//! - [`repositories`]: the statement set for events and their extensions
//! - [`coordinator`]: transactions, isolation, retries and cancellation
//! - [`adapters`]: the `EventStorePort` implementation used in production
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, CompositionCoordinator, DatabaseConfig, PostgresEventStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/baby_tracker")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresEventStore::new(CompositionCoordinator::new(pool));
//! ```

pub mod pool;
pub mod error;
pub mod migrations;
pub mod repositories;
pub mod coordinator;
pub mod adapters;

pub use pool::{close_pool, create_lazy_pool, create_pool, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use migrations::{run_migrations, MIGRATOR};
pub use repositories::{EventFilter, EventRepository};
pub use coordinator::{CompositionCoordinator, TransactionIsolation, TxFuture};
pub use adapters::PostgresEventStore;
