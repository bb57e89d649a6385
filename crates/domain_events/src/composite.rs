//! Composite events
//!
//! A [`CompositeEvent`] is what readers get back: the base event plus the
//! extension its type calls for, joined in one value. [`NewExtension`] is the
//! write-side counterpart, tagged with the event type it belongs to so a
//! mismatch can be rejected before anything is written.

use serde::{Deserialize, Serialize};

use core_kernel::EventId;

use crate::event::{Event, EventType};
use crate::feeding::{Feeding, FeedingEvent, NewFeeding};

/// A stored extension row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventExtension {
    Feeding(Feeding),
}

impl EventExtension {
    /// The event type this extension belongs to
    pub fn event_type(&self) -> EventType {
        match self {
            EventExtension::Feeding(_) => EventType::Feeding,
        }
    }

    /// The parent id the extension references
    pub fn event_id(&self) -> EventId {
        match self {
            EventExtension::Feeding(feeding) => feeding.event_id,
        }
    }
}

/// Extension payload for an event that has not been written yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NewExtension {
    Feeding(NewFeeding),
}

impl NewExtension {
    /// The event type this payload belongs to
    pub fn event_type(&self) -> EventType {
        match self {
            NewExtension::Feeding(_) => EventType::Feeding,
        }
    }

    pub fn at_stored_precision(self) -> Self {
        match self {
            NewExtension::Feeding(feeding) => NewExtension::Feeding(feeding.at_stored_precision()),
        }
    }
}

/// Base event joined with its extension, if its type has one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeEvent {
    pub event: Event,
    pub extension: Option<EventExtension>,
}

impl CompositeEvent {
    pub fn base_only(event: Event) -> Self {
        Self {
            event,
            extension: None,
        }
    }

    pub fn id(&self) -> EventId {
        self.event.id
    }

    pub fn event_type(&self) -> EventType {
        self.event.event_type
    }

    pub fn feeding(&self) -> Option<&Feeding> {
        match &self.extension {
            Some(EventExtension::Feeding(feeding)) => Some(feeding),
            None => None,
        }
    }

    /// Checks that the extension matches the base event's type and id
    ///
    /// Returns a description of the first broken invariant.
    pub fn check_consistency(&self) -> Result<(), String> {
        match &self.extension {
            Some(extension) if extension.event_type() != self.event.event_type => Err(format!(
                "{} has type '{}' but carries a '{}' extension",
                self.event.id,
                self.event.event_type,
                extension.event_type()
            )),
            Some(extension) if extension.event_id() != self.event.id => Err(format!(
                "extension references {} but is attached to {}",
                extension.event_id(),
                self.event.id
            )),
            None if self.event.event_type.requires_extension() => Err(format!(
                "{} has type '{}' but no extension",
                self.event.id, self.event.event_type
            )),
            _ => Ok(()),
        }
    }
}

impl From<FeedingEvent> for CompositeEvent {
    fn from(value: FeedingEvent) -> Self {
        Self {
            event: value.event,
            extension: Some(EventExtension::Feeding(value.feeding)),
        }
    }
}

impl TryFrom<CompositeEvent> for FeedingEvent {
    type Error = String;

    fn try_from(value: CompositeEvent) -> Result<Self, Self::Error> {
        match value.extension {
            Some(EventExtension::Feeding(feeding)) => FeedingEvent::try_new(value.event, feeding),
            None => Err(format!(
                "{} of type '{}' has no feeding extension",
                value.event.id, value.event.event_type
            )),
        }
    }
}
