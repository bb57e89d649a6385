//! Repository implementations
//!
//! Repositories hold SQL statements and map between database rows and
//! domain types. They run on a connection supplied by the caller and leave
//! transaction boundaries to the coordinator.

pub mod event;

pub use event::{EventFilter, EventRepository};
