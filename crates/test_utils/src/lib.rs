//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! baby tracker test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for common events
//! - `builders`: Builder patterns for event and feeding construction
//! - `database`: PostgreSQL container management and fault injection
//! - `assertions`: Custom assertion helpers for composite events
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
