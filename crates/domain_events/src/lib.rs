//! Infant Event Domain
//!
//! This crate records what happens to a baby over the day. Every record is a
//! base [`Event`]; some event types also carry an extension record with
//! type-specific details, keyed by the base event's id.
//!
//! # Composition Model
//!
//! - **Feeding**: base event plus exactly one [`Feeding`] extension
//! - **Diaper**, **Sleep**, **Generic**: base event only
//!
//! A base event and its extension are always written together. A reader
//! never observes a feeding event without its feeding, and a failed write
//! leaves neither row behind.
//!
//! # Examples
//!
//! ```rust
//! use domain_events::{EventType, NewEvent, NewFeeding, FeedType, EventValidator, NewExtension};
//! use chrono::{Duration, Utc};
//! use rust_decimal_macros::dec;
//!
//! let start = Utc::now();
//! let event = NewEvent::new(EventType::Feeding, start);
//! let feeding = NewFeeding {
//!     amount: dec!(120.0),
//!     feed_type: FeedType::Bottle,
//!     spitup: false,
//!     start_time: start,
//!     end_time: start + Duration::minutes(15),
//! };
//!
//! let checked = EventValidator::validate_composite(&event, Some(&NewExtension::Feeding(feeding)));
//! assert!(checked.is_valid());
//! ```

pub mod event;
pub mod feeding;
pub mod composite;
pub mod error;
pub mod validation;
pub mod ports;
pub mod services;

pub use event::{Event, EventType, Mood, NewEvent, UnknownVariant};
pub use feeding::{Feeding, FeedingEvent, FeedType, NewFeeding};
pub use composite::{CompositeEvent, EventExtension, NewExtension};
pub use error::{ErrorKind, EventError};
pub use validation::{
    EventValidator, ValidationResult, MAX_FEEDING_AMOUNT, MAX_FEEDING_HOURS, MAX_NOTES_CHARS,
    MAX_PAGE_SIZE,
};
pub use ports::{EventQuery, EventStorePort, Patch, UpdateEventRequest, DEFAULT_PAGE_SIZE};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::InMemoryEventStore;
pub use services::EventService;
