//! Feeding extension
//!
//! A feeding is stored as a base [`Event`] of type [`EventType::Feeding`]
//! plus exactly one [`Feeding`] row keyed by the event id.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{to_stored_precision, EventId, TimeSpan, TemporalError};

use crate::event::{Event, EventType, UnknownVariant};

/// How the baby was fed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedType {
    Bottle,
    Breast,
    Solid,
}

impl FeedType {
    pub const ALL: [FeedType; 3] = [FeedType::Bottle, FeedType::Breast, FeedType::Solid];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::Bottle => "bottle",
            FeedType::Breast => "breast",
            FeedType::Solid => "solid",
        }
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeedType::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("feed type", s, &FeedType::ALL.map(|f| f.as_str())))
    }
}

/// A committed feeding extension row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feeding {
    /// The parent event; unique across all feedings
    pub event_id: EventId,
    /// Quantity fed (ml for bottle, grams for solids, minutes for breast)
    pub amount: Decimal,
    pub feed_type: FeedType,
    pub spitup: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Feeding {
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}

/// Feeding fields for an extension that has not been written yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeeding {
    pub amount: Decimal,
    pub feed_type: FeedType,
    pub spitup: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl NewFeeding {
    /// Checked span of the feeding
    pub fn span(&self) -> Result<TimeSpan, TemporalError> {
        TimeSpan::new(self.start_time, self.end_time)
    }

    /// Same feeding with both ends cut to stored precision
    pub fn at_stored_precision(mut self) -> Self {
        self.start_time = to_stored_precision(self.start_time);
        self.end_time = to_stored_precision(self.end_time);
        self
    }
}

/// A feeding event: the base event joined with its feeding extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedingEvent {
    pub event: Event,
    pub feeding: Feeding,
}

impl FeedingEvent {
    /// Pairs an event with its feeding, rejecting mismatched ids or types
    pub fn try_new(event: Event, feeding: Feeding) -> Result<Self, String> {
        if event.event_type != EventType::Feeding {
            return Err(format!(
                "event {} has type '{}', not 'feeding'",
                event.id, event.event_type
            ));
        }
        if feeding.event_id != event.id {
            return Err(format!(
                "feeding references {} but was paired with {}",
                feeding.event_id, event.id
            ));
        }
        Ok(Self { event, feeding })
    }

    /// The generated parent id
    pub fn event_id(&self) -> EventId {
        self.event.id
    }
}
