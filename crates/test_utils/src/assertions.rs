//! Custom Test Assertions
//!
//! Provides assertion helpers for composite events that give more meaningful
//! failure messages than comparing whole structs.

use domain_events::{CompositeEvent, FeedingEvent, NewEvent, NewFeeding};

/// Asserts that a composite satisfies the type/extension pairing rules
///
/// # Panics
///
/// Panics with the consistency message if the pairing is broken
pub fn assert_composite_consistent(composite: &CompositeEvent) {
    if let Err(message) = composite.check_consistency() {
        panic!("Composite {} is inconsistent: {}", composite.id(), message);
    }
}

/// Asserts that a stored base event carries the requested fields
pub fn assert_event_matches(composite: &CompositeEvent, request: &NewEvent) {
    let event = &composite.event;
    assert!(
        event.id.is_assigned(),
        "Stored event has no assigned id: {:?}",
        event
    );
    assert_eq!(event.event_type, request.event_type, "event_type differs");
    assert_eq!(event.time, request.time, "time differs");
    assert_eq!(event.notes, request.notes, "notes differ");
    assert_eq!(event.mood, request.mood, "mood differs");
}

/// Asserts that a stored feeding composite carries every requested field
pub fn assert_feeding_matches(stored: &FeedingEvent, event: &NewEvent, feeding: &NewFeeding) {
    assert_event_matches(&CompositeEvent::from(stored.clone()), event);

    let actual = &stored.feeding;
    assert_eq!(
        actual.event_id, stored.event.id,
        "Feeding is linked to {} but its base event is {}",
        actual.event_id, stored.event.id
    );
    assert_eq!(actual.amount, feeding.amount, "amount differs");
    assert_eq!(actual.feed_type, feeding.feed_type, "feed_type differs");
    assert_eq!(actual.spitup, feeding.spitup, "spitup differs");
    assert_eq!(actual.start_time, feeding.start_time, "start_time differs");
    assert_eq!(actual.end_time, feeding.end_time, "end_time differs");
}

/// Asserts that events are ordered newest first, ties broken by id
pub fn assert_newest_first(events: &[CompositeEvent]) {
    for pair in events.windows(2) {
        let (a, b) = (&pair[0].event, &pair[1].event);
        assert!(
            (a.time, a.id) > (b.time, b.id),
            "{} at {} is listed before {} at {}",
            a.id,
            a.time,
            b.id,
            b.time
        );
    }
}
