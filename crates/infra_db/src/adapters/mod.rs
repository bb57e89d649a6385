//! Domain Adapters
//!
//! This module provides adapter implementations for domain ports,
//! connecting domain interfaces to the PostgreSQL database layer.

pub mod event;

pub use event::{db_to_port_error, PostgresEventStore};
