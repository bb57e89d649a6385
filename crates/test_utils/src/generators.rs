//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating requests, both ones that
//! satisfy every write-time rule and ones that break exactly one.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_events::{
    EventType, FeedType, Mood, NewEvent, NewFeeding, MAX_FEEDING_AMOUNT, MAX_FEEDING_HOURS,
    MAX_NOTES_CHARS,
};

/// Strategy for every event type
pub fn event_type_strategy() -> impl Strategy<Value = EventType> {
    prop::sample::select(EventType::ALL.to_vec())
}

/// Strategy for event types stored without an extension
pub fn base_only_type_strategy() -> impl Strategy<Value = EventType> {
    prop::sample::select(
        EventType::ALL
            .into_iter()
            .filter(|t| !t.requires_extension())
            .collect::<Vec<_>>(),
    )
}

pub fn mood_strategy() -> impl Strategy<Value = Mood> {
    prop::sample::select(Mood::ALL.to_vec())
}

pub fn feed_type_strategy() -> impl Strategy<Value = FeedType> {
    prop::sample::select(FeedType::ALL.to_vec())
}

/// Strategy for timestamps within 2024, at second precision
pub fn timestamp_2024_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..366 * 24 * 3600).prop_map(|seconds| {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(seconds)
    })
}

/// Strategy for in-range amounts with up to two decimal places
pub fn valid_amount_strategy() -> impl Strategy<Value = Decimal> {
    let max_minor = (MAX_FEEDING_AMOUNT * Decimal::ONE_HUNDRED)
        .trunc()
        .mantissa() as i64;
    (0i64..=max_minor).prop_map(|minor| Decimal::new(minor, 2))
}

/// Strategy for notes within the length limit
pub fn notes_strategy() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[a-zA-Z0-9 .,!?]{0,200}")
}

/// Strategy for base event requests of any type
pub fn new_event_strategy() -> impl Strategy<Value = NewEvent> {
    (
        event_type_strategy(),
        timestamp_2024_strategy(),
        notes_strategy(),
        proptest::option::of(mood_strategy()),
    )
        .prop_map(|(event_type, time, notes, mood)| NewEvent {
            event_type,
            time,
            notes,
            mood,
        })
}

/// Strategy for feedings that pass validation
pub fn valid_feeding_strategy() -> impl Strategy<Value = NewFeeding> {
    (
        valid_amount_strategy(),
        feed_type_strategy(),
        any::<bool>(),
        timestamp_2024_strategy(),
        0i64..=MAX_FEEDING_HOURS * 60,
    )
        .prop_map(|(amount, feed_type, spitup, start_time, minutes)| NewFeeding {
            amount,
            feed_type,
            spitup,
            start_time,
            end_time: start_time + Duration::minutes(minutes),
        })
}

/// Strategy for feedings that break exactly one rule
///
/// Covers negative amounts, inverted spans and over-long spans.
pub fn invalid_feeding_strategy() -> impl Strategy<Value = NewFeeding> {
    let negative_amount = (valid_feeding_strategy(), 1i64..100_000).prop_map(|(mut f, minor)| {
        f.amount = Decimal::new(-minor, 2);
        f
    });
    let inverted = (valid_feeding_strategy(), 1i64..600).prop_map(|(mut f, minutes)| {
        f.end_time = f.start_time - Duration::minutes(minutes);
        f
    });
    let too_long = (valid_feeding_strategy(), 1i64..600).prop_map(|(mut f, minutes)| {
        f.end_time = f.start_time + Duration::hours(MAX_FEEDING_HOURS) + Duration::minutes(minutes);
        f
    });
    prop_oneof![negative_amount, inverted, too_long]
}

/// Strategy for notes one or more characters over the limit
pub fn oversized_notes_strategy() -> impl Strategy<Value = String> {
    (1usize..50).prop_map(|extra| "ä".repeat(MAX_NOTES_CHARS + extra))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_events::EventValidator;

    proptest! {
        #[test]
        fn valid_feedings_pass_validation(feeding in valid_feeding_strategy()) {
            prop_assert!(EventValidator::validate_new_feeding(&feeding).is_valid());
        }

        #[test]
        fn invalid_feedings_fail_validation(feeding in invalid_feeding_strategy()) {
            prop_assert!(!EventValidator::validate_new_feeding(&feeding).is_valid());
        }

        #[test]
        fn base_only_types_never_require_extension(event_type in base_only_type_strategy()) {
            prop_assert!(!event_type.requires_extension());
        }
    }
}
