//! Behavioural tests for EventService over the in-memory store

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal_macros::dec;

use core_kernel::{EventId, OperationContext, TimeWindow};

use domain_events::{
    ErrorKind, EventQuery, EventService, EventStorePort, EventType, FeedType, InMemoryEventStore,
    Mood, NewEvent, NewFeeding, UpdateEventRequest,
};

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, hour, minute, 0).unwrap()
}

fn bottle(start: DateTime<Utc>, minutes: i64) -> NewFeeding {
    NewFeeding {
        amount: dec!(120.0),
        feed_type: FeedType::Bottle,
        spitup: false,
        start_time: start,
        end_time: start + Duration::minutes(minutes),
    }
}

fn setup() -> (EventService, Arc<InMemoryEventStore>, OperationContext) {
    let store = Arc::new(InMemoryEventStore::new());
    (EventService::new(store.clone()), store, OperationContext::new())
}

// ============================================================================
// Creation
// ============================================================================

mod creation_tests {
    use super::*;

    #[tokio::test]
    async fn test_sub_microsecond_times_are_stored_at_microseconds() {
        let (service, store, ctx) = setup();
        let precise = at(2, 0) + Duration::nanoseconds(123_456_789);
        let expected = at(2, 0) + Duration::microseconds(123_456);

        let created = service
            .create_and_associate_feeding_event(
                &ctx,
                NewEvent::new(EventType::Feeding, precise),
                bottle(precise, 15),
            )
            .await
            .unwrap();
        assert_eq!(created.event.time, expected);
        assert_eq!(created.feeding.start_time, expected);
        assert_eq!(created.feeding.end_time, expected + Duration::minutes(15));

        let fetched = service.get_feeding_event(&ctx, created.event_id()).await.unwrap();
        assert_eq!(fetched, created);

        // the store applies the same rule when called directly
        let direct = store
            .create_composite(&ctx, NewEvent::new(EventType::Diaper, precise), None)
            .await
            .unwrap();
        assert_eq!(direct.event.time, expected);
    }

    #[tokio::test]
    async fn test_two_am_bottle_feeding() {
        let (service, store, ctx) = setup();

        let created = service
            .create_and_associate_feeding_event(
                &ctx,
                NewEvent::new(EventType::Feeding, at(2, 0)).with_notes("woke up hungry"),
                bottle(at(2, 0), 15),
            )
            .await
            .unwrap();

        assert!(created.event_id().is_assigned());
        assert_eq!(created.feeding.event_id, created.event_id());
        assert_eq!(created.feeding.amount, dec!(120.0));
        assert_eq!(created.feeding.duration(), Duration::minutes(15));
        assert_eq!(store.event_count().await, 1);
        assert_eq!(store.feeding_count().await, 1);
    }

    #[tokio::test]
    async fn test_base_only_types_need_no_extension() {
        let (service, _, ctx) = setup();

        for event_type in [EventType::Diaper, EventType::Sleep, EventType::Generic] {
            let created = service
                .create_event(&ctx, NewEvent::new(event_type, at(4, 0)).with_mood(Mood::Happy))
                .await
                .unwrap();
            let fetched = service.get_event(&ctx, created.id).await.unwrap();
            assert_eq!(fetched.event, created);
            assert!(fetched.extension.is_none());
        }
    }

    #[tokio::test]
    async fn test_feeding_without_extension_is_rejected() {
        let (service, store, ctx) = setup();

        let err = service
            .create_event(&ctx, NewEvent::new(EventType::Feeding, at(4, 0)))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(store.write_attempts(), 0);
    }

    #[tokio::test]
    async fn test_extension_on_wrong_type_is_rejected() {
        let (service, store, ctx) = setup();

        let err = service
            .create_and_associate_feeding_event(
                &ctx,
                NewEvent::new(EventType::Sleep, at(4, 0)),
                bottle(at(4, 0), 10),
            )
            .await
            .unwrap_err();

        assert_eq!(err.field(), Some("event_type"));
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_extension_write_leaves_nothing() {
        let (service, store, ctx) = setup();
        store.fail_next_extension_write();

        let err = service
            .create_and_associate_feeding_event(
                &ctx,
                NewEvent::new(EventType::Feeding, at(5, 0)),
                bottle(at(5, 0), 20),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert_eq!(store.event_count().await, 0);
        assert_eq!(store.feeding_count().await, 0);

        let listed = service.list_events(&ctx, EventQuery::default()).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_context_writes_nothing() {
        let (service, store, ctx) = setup();
        ctx.cancel();

        let err = service
            .create_and_associate_feeding_event(
                &ctx,
                NewEvent::new(EventType::Feeding, at(5, 0)),
                bottle(at(5, 0), 20),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(store.event_count().await, 0);
    }
}

// ============================================================================
// Association
// ============================================================================

mod association_tests {
    use super::*;

    #[tokio::test]
    async fn test_second_feeding_conflicts() {
        let (service, store, ctx) = setup();
        let created = service
            .create_and_associate_feeding_event(
                &ctx,
                NewEvent::new(EventType::Feeding, at(6, 0)),
                bottle(at(6, 0), 10),
            )
            .await
            .unwrap();

        let err = service
            .associate_feeding(&ctx, created.event_id(), bottle(at(6, 30), 10))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(store.feeding_count().await, 1);
        let fetched = service.get_feeding_event(&ctx, created.event_id()).await.unwrap();
        assert_eq!(fetched.feeding, created.feeding);
    }

    #[tokio::test]
    async fn test_associate_to_missing_event_is_not_found() {
        let (service, _, ctx) = setup();

        let err = service
            .associate_feeding(&ctx, EventId::new(404), bottle(at(6, 0), 10))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_associate_to_non_feeding_event_is_rejected() {
        let (service, store, ctx) = setup();
        let diaper = service
            .create_event(&ctx, NewEvent::new(EventType::Diaper, at(6, 0)))
            .await
            .unwrap();

        let err = service
            .associate_feeding(&ctx, diaper.id, bottle(at(6, 0), 10))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(store.feeding_count().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_associations_leave_one_feeding() {
        let store = Arc::new(InMemoryEventStore::new());
        let service = EventService::new(store.clone());
        let ctx = OperationContext::new();
        let created = service
            .create_and_associate_feeding_event(
                &ctx,
                NewEvent::new(EventType::Feeding, at(8, 0)),
                bottle(at(8, 0), 10),
            )
            .await
            .unwrap();
        let id = created.event_id();

        let mut handles = Vec::new();
        for minute in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .associate_feeding(&OperationContext::new(), id, bottle(at(9, minute), 5))
                    .await
            }));
        }

        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Conflict);
        }
        assert_eq!(store.feeding_count().await, 1);
    }
}

// ============================================================================
// Reads, updates and deletes
// ============================================================================

mod lifecycle_tests {
    use super::*;

    async fn seed(service: &EventService, ctx: &OperationContext) {
        service
            .create_and_associate_feeding_event(ctx, NewEvent::new(EventType::Feeding, at(1, 0)), bottle(at(1, 0), 10))
            .await
            .unwrap();
        service
            .create_event(ctx, NewEvent::new(EventType::Diaper, at(2, 0)))
            .await
            .unwrap();
        service
            .create_and_associate_feeding_event(ctx, NewEvent::new(EventType::Feeding, at(3, 0)), bottle(at(3, 0), 10))
            .await
            .unwrap();
        service
            .create_event(ctx, NewEvent::new(EventType::Sleep, at(4, 0)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_is_newest_first_with_extensions() {
        let (service, _, ctx) = setup();
        seed(&service, &ctx).await;

        let listed = service.list_events(&ctx, EventQuery::default()).await.unwrap();

        let times: Vec<_> = listed.iter().map(|e| e.event.time).collect();
        assert_eq!(times, vec![at(4, 0), at(3, 0), at(2, 0), at(1, 0)]);
        for composite in &listed {
            assert!(composite.check_consistency().is_ok());
        }
    }

    #[tokio::test]
    async fn test_list_filters_by_type_and_window() {
        let (service, _, ctx) = setup();
        seed(&service, &ctx).await;

        let query = EventQuery::by_type(EventType::Feeding).within(TimeWindow {
            from: Some(at(2, 0)),
            to: Some(at(4, 0)),
        });
        let listed = service.list_events(&ctx, query).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].event.time, at(3, 0));
        assert!(listed[0].feeding().is_some());
    }

    #[tokio::test]
    async fn test_list_paginates() {
        let (service, _, ctx) = setup();
        seed(&service, &ctx).await;

        let page = service
            .list_events(&ctx, EventQuery::default().paginate(2, 1))
            .await
            .unwrap();

        let times: Vec<_> = page.iter().map(|e| e.event.time).collect();
        assert_eq!(times, vec![at(3, 0), at(2, 0)]);
    }

    #[tokio::test]
    async fn test_update_changes_only_patched_fields() {
        let (service, _, ctx) = setup();
        let created = service
            .create_event(
                &ctx,
                NewEvent::new(EventType::Sleep, at(13, 0))
                    .with_notes("nap")
                    .with_mood(Mood::Fussy),
            )
            .await
            .unwrap();

        let updated = service
            .update_event(&ctx, created.id, UpdateEventRequest::default().set_mood(Mood::Calm))
            .await
            .unwrap();
        assert_eq!(updated.event.notes.as_deref(), Some("nap"));
        assert_eq!(updated.event.mood, Some(Mood::Calm));
        assert_eq!(updated.event.time, created.time);

        let cleared = service
            .update_event(&ctx, created.id, UpdateEventRequest::default().clear_notes())
            .await
            .unwrap();
        assert_eq!(cleared.event.notes, None);
        assert_eq!(cleared.event.mood, Some(Mood::Calm));
    }

    #[tokio::test]
    async fn test_update_keeps_feeding_extension() {
        let (service, _, ctx) = setup();
        let created = service
            .create_and_associate_feeding_event(&ctx, NewEvent::new(EventType::Feeding, at(1, 0)), bottle(at(1, 0), 10))
            .await
            .unwrap();

        let updated = service
            .update_event(&ctx, created.event_id(), UpdateEventRequest::default().set_notes(""))
            .await
            .unwrap();

        assert_eq!(updated.event.notes.as_deref(), Some(""));
        assert_eq!(updated.feeding(), Some(&created.feeding));
    }

    #[tokio::test]
    async fn test_update_missing_event_is_not_found() {
        let (service, _, ctx) = setup();
        let err = service
            .update_event(&ctx, EventId::new(77), UpdateEventRequest::default().set_mood(Mood::Happy))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_removes_event_and_extension() {
        let (service, store, ctx) = setup();
        let created = service
            .create_and_associate_feeding_event(&ctx, NewEvent::new(EventType::Feeding, at(1, 0)), bottle(at(1, 0), 10))
            .await
            .unwrap();

        service.delete_event(&ctx, created.event_id()).await.unwrap();

        assert_eq!(store.event_count().await, 0);
        assert_eq!(store.feeding_count().await, 0);
        let err = service.get_event(&ctx, created.event_id()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let again = service.delete_event(&ctx, created.event_id()).await.unwrap_err();
        assert_eq!(again.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_health_check_reports_healthy() {
        let (service, _, _) = setup();
        assert!(service.health_check().await.is_healthy());
    }
}

// ============================================================================
// Concurrency
// ============================================================================

mod concurrency_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_see_half_written_feedings() {
        let store = Arc::new(InMemoryEventStore::new());
        let service = EventService::new(store.clone());

        let writer = {
            let service = service.clone();
            tokio::spawn(async move {
                let ctx = OperationContext::new();
                for i in 0..50 {
                    let start = at(0, 0) + Duration::minutes(i);
                    service
                        .create_and_associate_feeding_event(&ctx, NewEvent::new(EventType::Feeding, start), bottle(start, 5))
                        .await
                        .unwrap();
                }
            })
        };

        let reader = {
            let service = service.clone();
            tokio::spawn(async move {
                let ctx = OperationContext::new();
                for _ in 0..50 {
                    let listed = service
                        .list_events(&ctx, EventQuery::default().paginate(500, 0))
                        .await
                        .unwrap();
                    for composite in listed {
                        assert!(composite.check_consistency().is_ok());
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        writer.await.unwrap();
        reader.await.unwrap();
        assert_eq!(store.event_count().await, 50);
        assert_eq!(store.feeding_count().await, 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_creates_get_distinct_ids() {
        let store = Arc::new(InMemoryEventStore::new());
        let service = EventService::new(store.clone());

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .create_event(&OperationContext::new(), NewEvent::new(EventType::Generic, at(10, i)))
                        .await
                        .unwrap()
                        .id
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }
}
