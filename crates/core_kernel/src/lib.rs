//! Core Kernel - Foundational types shared by the baby tracker crates
//!
//! This crate provides the building blocks used by the domain and
//! infrastructure layers:
//! - Store-assigned identifiers
//! - Port error type and adapter health traits
//! - Cancellation-aware operation context
//! - Retry policy and temporal value types

pub mod identifiers;
pub mod temporal;
pub mod ports;
pub mod context;
pub mod retry;

pub use identifiers::EventId;
pub use temporal::{to_stored_precision, TimeSpan, TimeWindow, TemporalError};
pub use ports::{
    PortError, DomainPort, AdapterHealth, HealthCheckResult, HealthCheckable,
    OperationMetadata,
};
pub use context::{millis, OperationContext, Interruption};
pub use retry::RetryPolicy;
