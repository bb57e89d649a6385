//! Test Data Builders
//!
//! Provides builder patterns for constructing requests with sensible defaults.
//! Tests specify only the fields they care about.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use domain_events::{EventType, FeedType, Mood, NewEvent, NewExtension, NewFeeding};

use crate::fixtures::{AmountFixtures, TemporalFixtures};

/// Builder for base event requests
pub struct NewEventBuilder {
    event_type: EventType,
    time: DateTime<Utc>,
    notes: Option<String>,
    mood: Option<Mood>,
}

impl Default for NewEventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewEventBuilder {
    /// Creates a new builder for a generic event at 08:00
    pub fn new() -> Self {
        Self {
            event_type: EventType::Generic,
            time: TemporalFixtures::at(8, 0),
            notes: None,
            mood: None,
        }
    }

    /// Starts a feeding event
    pub fn feeding() -> Self {
        Self::new().with_type(EventType::Feeding)
    }

    pub fn with_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type;
        self
    }

    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_mood(mut self, mood: Mood) -> Self {
        self.mood = Some(mood);
        self
    }

    /// Builds the request
    pub fn build(self) -> NewEvent {
        NewEvent {
            event_type: self.event_type,
            time: self.time,
            notes: self.notes,
            mood: self.mood,
        }
    }
}

/// Builder for feeding extension requests
///
/// Defaults to a fifteen minute bottle starting at 08:00.
pub struct NewFeedingBuilder {
    amount: Decimal,
    feed_type: FeedType,
    spitup: bool,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

impl Default for NewFeedingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewFeedingBuilder {
    pub fn new() -> Self {
        let start = TemporalFixtures::at(8, 0);
        Self {
            amount: AmountFixtures::bottle(),
            feed_type: FeedType::Bottle,
            spitup: false,
            start_time: start,
            end_time: start + Duration::minutes(15),
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_feed_type(mut self, feed_type: FeedType) -> Self {
        self.feed_type = feed_type;
        self
    }

    pub fn with_spitup(mut self, spitup: bool) -> Self {
        self.spitup = spitup;
        self
    }

    /// Moves the feed to `start`, keeping its current length
    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        let length = self.end_time - self.start_time;
        self.start_time = start;
        self.end_time = start + length;
        self
    }

    /// Sets the feed length; negative lengths produce an inverted span
    pub fn lasting(mut self, length: Duration) -> Self {
        self.end_time = self.start_time + length;
        self
    }

    pub fn build(self) -> NewFeeding {
        NewFeeding {
            amount: self.amount,
            feed_type: self.feed_type,
            spitup: self.spitup,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    /// Builds the request wrapped as an extension
    pub fn build_extension(self) -> NewExtension {
        NewExtension::Feeding(self.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_event_builder_defaults() {
        let event = NewEventBuilder::new().build();

        assert_eq!(event.event_type, EventType::Generic);
        assert!(event.notes.is_none());
        assert!(event.mood.is_none());
    }

    #[test]
    fn test_event_builder_with_custom_values() {
        let time = TemporalFixtures::at(21, 45);
        let event = NewEventBuilder::feeding()
            .at(time)
            .with_notes("dream feed")
            .with_mood(Mood::Calm)
            .build();

        assert_eq!(event.event_type, EventType::Feeding);
        assert_eq!(event.time, time);
        assert_eq!(event.notes.as_deref(), Some("dream feed"));
        assert_eq!(event.mood, Some(Mood::Calm));
    }

    #[test]
    fn test_feeding_builder_keeps_length_when_moved() {
        let feeding = NewFeedingBuilder::new()
            .lasting(Duration::minutes(40))
            .starting_at(TemporalFixtures::at(3, 0))
            .with_amount(dec!(90))
            .build();

        assert_eq!(feeding.start_time, TemporalFixtures::at(3, 0));
        assert_eq!(feeding.end_time, TemporalFixtures::at(3, 40));
        assert_eq!(feeding.amount, dec!(90));
    }

    #[test]
    fn test_build_extension_wraps_feeding() {
        let extension = NewFeedingBuilder::new()
            .with_feed_type(FeedType::Breast)
            .build_extension();

        assert_eq!(extension.event_type(), EventType::Feeding);
    }
}
