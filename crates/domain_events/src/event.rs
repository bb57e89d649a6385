//! Base event types
//!
//! An [`Event`] is the aggregate root for everything recorded about the
//! baby: when it happened, what kind of event it was, and optional notes and
//! mood. Type-specific details live in extension records (see
//! [`crate::feeding`]) that reference the event by id.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::{to_stored_precision, EventId};

/// Error returned when a string is not one of a closed set of tags
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}'; expected one of: {expected}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str, expected: &[&str]) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected: expected.join(", "),
        }
    }
}

/// Closed set of event kinds
///
/// A new kind is added here together with its extension table, never by
/// accepting arbitrary strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A feed; always carries a feeding extension
    Feeding,
    /// A diaper change
    Diaper,
    /// A sleep period
    Sleep,
    /// Anything else worth noting
    Generic,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Feeding,
        EventType::Diaper,
        EventType::Sleep,
        EventType::Generic,
    ];

    /// Stable tag used in storage and at the boundary
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Feeding => "feeding",
            EventType::Diaper => "diaper",
            EventType::Sleep => "sleep",
            EventType::Generic => "generic",
        }
    }

    /// True when an event of this type cannot be stored without its extension
    pub fn requires_extension(&self) -> bool {
        matches!(self, EventType::Feeding)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                UnknownVariant::new("event type", s, &EventType::ALL.map(|t| t.as_str()))
            })
    }
}

/// Closed set of moods that can be attached to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Happy,
    Fussy,
    Calm,
    Crying,
}

impl Mood {
    pub const ALL: [Mood; 4] = [Mood::Happy, Mood::Fussy, Mood::Calm, Mood::Crying];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Fussy => "fussy",
            Mood::Calm => "calm",
            Mood::Crying => "crying",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("mood", s, &Mood::ALL.map(|m| m.as_str())))
    }
}

/// A committed base event
///
/// Only ever constructed from stored data, so `id` is always store-assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Store-assigned identifier, immutable once created
    pub id: EventId,
    /// Which extension (if any) applies
    pub event_type: EventType,
    /// When the event happened
    pub time: DateTime<Utc>,
    /// Free text; `Some("")` is kept distinct from `None`
    pub notes: Option<String>,
    pub mood: Option<Mood>,
    /// When the row was written
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Base fields for an event that has not been written yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub event_type: EventType,
    pub time: DateTime<Utc>,
    pub notes: Option<String>,
    pub mood: Option<Mood>,
}

impl NewEvent {
    /// Creates base fields with no notes and no mood
    pub fn new(event_type: EventType, time: DateTime<Utc>) -> Self {
        Self {
            event_type,
            time,
            notes: None,
            mood: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_mood(mut self, mood: Mood) -> Self {
        self.mood = Some(mood);
        self
    }

    /// Same event with `time` cut to stored precision
    pub fn at_stored_precision(mut self) -> Self {
        self.time = to_stored_precision(self.time);
        self
    }
}
