//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for the event store. Times are pinned to a
//! single day so ordering assertions stay predictable.

use chrono::{DateTime, Duration, TimeZone, Utc};
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use domain_events::{EventType, FeedType, Mood, NewEvent, NewFeeding};

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// The reference day every fixture lives on (2024-03-14, midnight UTC)
    pub fn day_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, 0, 0, 0).unwrap()
    }

    /// A time on the reference day
    pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Self::day_start() + Duration::hours(hour as i64) + Duration::minutes(minute as i64)
    }

    /// The 2am bottle
    pub fn night_feed_start() -> DateTime<Utc> {
        Self::at(2, 0)
    }

    pub fn night_feed_end() -> DateTime<Utc> {
        Self::at(2, 20)
    }
}

/// Fixture for feeding quantities
pub struct AmountFixtures;

impl AmountFixtures {
    /// A typical bottle, in millilitres
    pub fn bottle() -> Decimal {
        dec!(120.0)
    }

    /// Breast feeds are often logged without an amount
    pub fn unmeasured() -> Decimal {
        Decimal::ZERO
    }

    pub fn negative() -> Decimal {
        dec!(-5)
    }
}

/// Fixture for whole requests
pub struct EventFixtures;

impl EventFixtures {
    /// The base half of the 2am bottle
    pub fn night_feed_event() -> NewEvent {
        NewEvent::new(EventType::Feeding, TemporalFixtures::night_feed_start())
            .with_notes("2am bottle")
            .with_mood(Mood::Fussy)
    }

    /// The extension half of the 2am bottle
    pub fn night_feed() -> NewFeeding {
        NewFeeding {
            amount: AmountFixtures::bottle(),
            feed_type: FeedType::Bottle,
            spitup: true,
            start_time: TemporalFixtures::night_feed_start(),
            end_time: TemporalFixtures::night_feed_end(),
        }
    }

    /// A diaper change with no extension
    pub fn diaper_change(hour: u32) -> NewEvent {
        NewEvent::new(EventType::Diaper, TemporalFixtures::at(hour, 0))
    }

    /// A generic event with random prose in its notes
    pub fn noted_generic(hour: u32) -> NewEvent {
        let notes: String = Sentence(3..8).fake();
        NewEvent::new(EventType::Generic, TemporalFixtures::at(hour, 0)).with_notes(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_night_feed_halves_agree() {
        let event = EventFixtures::night_feed_event();
        let feeding = EventFixtures::night_feed();

        assert_eq!(event.event_type, EventType::Feeding);
        assert_eq!(event.time, feeding.start_time);
        assert!(feeding.start_time < feeding.end_time);
    }

    #[test]
    fn test_temporal_fixtures_ordering() {
        assert!(TemporalFixtures::day_start() < TemporalFixtures::at(0, 1));
        assert!(TemporalFixtures::at(2, 0) < TemporalFixtures::at(14, 30));
    }

    #[test]
    fn test_generated_notes_are_not_empty() {
        let event = EventFixtures::noted_generic(9);
        assert!(!event.notes.unwrap_or_default().is_empty());
    }
}
