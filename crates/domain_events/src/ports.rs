//! Event Domain Ports
//!
//! This module defines the port interface for the event store, enabling
//! swappable implementations selected by dependency injection:
//!
//! - **PostgreSQL Adapter**: `infra_db::PostgresEventStore`, the production
//!   variant, backed by the composition coordinator
//! - **In-Memory Adapter**: [`mock::InMemoryEventStore`], for tests without a
//!   database
//!
//! # Contract
//!
//! Every write method is atomic: on success the base event and any extension
//! are both committed; on failure neither is. No implementation may expose a
//! base event whose promised extension is still missing.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_events::{EventService, EventStorePort};
//! use std::sync::Arc;
//!
//! let store: Arc<dyn EventStorePort> = Arc::new(PostgresEventStore::new(coordinator));
//! let service = EventService::new(store);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{
    DomainPort, EventId, HealthCheckable, OperationContext, PortError, TimeWindow,
};

use crate::composite::{CompositeEvent, NewExtension};
use crate::event::{EventType, Mood, NewEvent};
use crate::feeding::{FeedingEvent, NewFeeding};

/// Page size used when a query does not set one
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Three-way field update
///
/// Keeps "leave unchanged", "clear" and "set" distinct, so setting notes to
/// an empty string is never confused with removing them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Patch<T> {
    Keep,
    Clear,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    /// Applies the patch to the current value
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Keep => current,
            Patch::Clear => None,
            Patch::Set(value) => Some(value),
        }
    }
}

/// Request for updating the mutable fields of an event
///
/// The type and extension of an event never change after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub notes: Patch<String>,
    #[serde(default)]
    pub mood: Patch<Mood>,
}

impl UpdateEventRequest {
    pub fn set_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Patch::Set(notes.into());
        self
    }

    pub fn clear_notes(mut self) -> Self {
        self.notes = Patch::Clear;
        self
    }

    pub fn set_mood(mut self, mood: Mood) -> Self {
        self.mood = Patch::Set(mood);
        self
    }

    pub fn clear_mood(mut self) -> Self {
        self.mood = Patch::Clear;
        self
    }

    /// True when the request changes nothing
    pub fn is_empty(&self) -> bool {
        self.notes.is_keep() && self.mood.is_keep()
    }
}

/// Query parameters for listing events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQuery {
    /// Filter by event type
    pub event_type: Option<EventType>,
    /// Filter by event time, `[from, to)`
    #[serde(default)]
    pub window: TimeWindow,
    /// Limit results
    pub limit: Option<u32>,
    /// Offset for pagination
    pub offset: Option<u32>,
}

impl EventQuery {
    /// Creates a query for one event type
    pub fn by_type(event_type: EventType) -> Self {
        Self {
            event_type: Some(event_type),
            ..Default::default()
        }
    }

    /// Restricts the query to a time window
    pub fn within(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    /// Adds pagination to the query
    pub fn paginate(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}

/// The port trait for event persistence
///
/// Implementations receive input the service has already validated, but must
/// still refuse to write anything that would break the base/extension
/// pairing.
#[async_trait]
pub trait EventStorePort: DomainPort + HealthCheckable {
    /// Atomically creates a base event and its optional extension
    ///
    /// # Returns
    ///
    /// The composed event with the store-assigned id
    async fn create_composite(
        &self,
        ctx: &OperationContext,
        event: NewEvent,
        extension: Option<NewExtension>,
    ) -> Result<CompositeEvent, PortError>;

    /// Attaches a feeding to an existing feeding event that has none
    ///
    /// Returns `PortError::Conflict` if the event already has a feeding.
    async fn associate_feeding(
        &self,
        ctx: &OperationContext,
        event_id: EventId,
        feeding: NewFeeding,
    ) -> Result<FeedingEvent, PortError>;

    /// Retrieves an event joined with its extension
    async fn get_event(
        &self,
        ctx: &OperationContext,
        id: EventId,
    ) -> Result<CompositeEvent, PortError>;

    /// Lists events, newest first
    async fn list_events(
        &self,
        ctx: &OperationContext,
        query: EventQuery,
    ) -> Result<Vec<CompositeEvent>, PortError>;

    /// Updates notes and mood
    async fn update_event(
        &self,
        ctx: &OperationContext,
        id: EventId,
        request: UpdateEventRequest,
    ) -> Result<CompositeEvent, PortError>;

    /// Deletes an event and its extension together
    async fn delete_event(
        &self,
        ctx: &OperationContext,
        id: EventId,
    ) -> Result<(), PortError>;
}

/// In-memory implementation of EventStorePort for testing
///
/// The whole store sits behind one lock, and each write builds its rows
/// before touching shared state, so readers only ever see complete writes.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use chrono::Utc;

    use core_kernel::{to_stored_precision, AdapterHealth, HealthCheckResult};

    use crate::composite::EventExtension;
    use crate::event::Event;
    use crate::feeding::Feeding;

    #[derive(Debug, Default)]
    struct State {
        next_id: i64,
        events: BTreeMap<EventId, Event>,
        feedings: HashMap<EventId, Feeding>,
    }

    impl State {
        fn allocate_id(&mut self) -> EventId {
            self.next_id += 1;
            EventId::new(self.next_id)
        }

        fn composite(&self, id: EventId) -> Option<CompositeEvent> {
            let event = self.events.get(&id)?.clone();
            let extension = self.feedings.get(&id).cloned().map(EventExtension::Feeding);
            Some(CompositeEvent { event, extension })
        }
    }

    /// In-memory event store with failure injection
    #[derive(Debug, Default)]
    pub struct InMemoryEventStore {
        state: Arc<RwLock<State>>,
        fail_next_extension: AtomicBool,
        write_attempts: AtomicU64,
    }

    impl InMemoryEventStore {
        /// Creates an empty store
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes the next extension insert fail after the base row was staged
        pub fn fail_next_extension_write(&self) {
            self.fail_next_extension.store(true, Ordering::SeqCst);
        }

        /// Number of write operations that reached the store, successful or not
        pub fn write_attempts(&self) -> u64 {
            self.write_attempts.load(Ordering::SeqCst)
        }

        pub async fn event_count(&self) -> usize {
            self.state.read().await.events.len()
        }

        pub async fn feeding_count(&self) -> usize {
            self.state.read().await.feedings.len()
        }

        fn begin_write(&self, ctx: &OperationContext, operation: &str) -> Result<(), PortError> {
            self.write_attempts.fetch_add(1, Ordering::SeqCst);
            match ctx.check() {
                Some(interruption) => Err(interruption.into_port_error(operation)),
                None => Ok(()),
            }
        }

        fn take_injected_failure(&self) -> bool {
            self.fail_next_extension.swap(false, Ordering::SeqCst)
        }
    }

    fn build_feeding(event_id: EventId, feeding: NewFeeding) -> Feeding {
        Feeding {
            event_id,
            amount: feeding.amount,
            feed_type: feeding.feed_type,
            spitup: feeding.spitup,
            start_time: to_stored_precision(feeding.start_time),
            end_time: to_stored_precision(feeding.end_time),
            created_at: Utc::now(),
        }
    }

    impl DomainPort for InMemoryEventStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryEventStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "in-memory-event-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("In-memory store always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl EventStorePort for InMemoryEventStore {
        async fn create_composite(
            &self,
            ctx: &OperationContext,
            event: NewEvent,
            extension: Option<NewExtension>,
        ) -> Result<CompositeEvent, PortError> {
            self.begin_write(ctx, "create_composite")?;
            if let Some(ext) = &extension {
                if ext.event_type() != event.event_type {
                    return Err(PortError::validation_field(
                        format!("'{}' extension on a '{}' event", ext.event_type(), event.event_type),
                        "event_type",
                    ));
                }
            }

            let mut state = self.state.write().await;
            let now = Utc::now();
            let id = state.allocate_id();
            let base = Event {
                id,
                event_type: event.event_type,
                time: to_stored_precision(event.time),
                notes: event.notes,
                mood: event.mood,
                created_at: now,
                updated_at: now,
            };

            let staged_extension = match extension {
                Some(NewExtension::Feeding(feeding)) => {
                    if self.take_injected_failure() {
                        return Err(PortError::connection("injected failure before extension insert"));
                    }
                    Some(build_feeding(id, feeding))
                }
                None => None,
            };

            state.events.insert(id, base);
            if let Some(feeding) = staged_extension {
                state.feedings.insert(id, feeding);
            }
            state
                .composite(id)
                .ok_or_else(|| PortError::consistency(format!("{} vanished after insert", id)))
        }

        async fn associate_feeding(
            &self,
            ctx: &OperationContext,
            event_id: EventId,
            feeding: NewFeeding,
        ) -> Result<FeedingEvent, PortError> {
            self.begin_write(ctx, "associate_feeding")?;
            let mut state = self.state.write().await;

            let event = state
                .events
                .get(&event_id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Event", event_id))?;
            if event.event_type != EventType::Feeding {
                return Err(PortError::validation_field(
                    format!("{} is a '{}' event", event_id, event.event_type),
                    "event_type",
                ));
            }
            if state.feedings.contains_key(&event_id) {
                return Err(PortError::conflict(format!("{} already has a feeding", event_id)));
            }
            if self.take_injected_failure() {
                return Err(PortError::connection("injected failure before extension insert"));
            }

            let row = build_feeding(event_id, feeding);
            state.feedings.insert(event_id, row.clone());
            FeedingEvent::try_new(event, row).map_err(PortError::consistency)
        }

        async fn get_event(
            &self,
            ctx: &OperationContext,
            id: EventId,
        ) -> Result<CompositeEvent, PortError> {
            if let Some(interruption) = ctx.check() {
                return Err(interruption.into_port_error("get_event"));
            }
            self.state
                .read()
                .await
                .composite(id)
                .ok_or_else(|| PortError::not_found("Event", id))
        }

        async fn list_events(
            &self,
            ctx: &OperationContext,
            query: EventQuery,
        ) -> Result<Vec<CompositeEvent>, PortError> {
            if let Some(interruption) = ctx.check() {
                return Err(interruption.into_port_error("list_events"));
            }
            let state = self.state.read().await;
            let mut matching: Vec<&Event> = state
                .events
                .values()
                .filter(|e| query.event_type.map_or(true, |t| e.event_type == t))
                .filter(|e| query.window.contains(e.time))
                .collect();
            matching.sort_by(|a, b| b.time.cmp(&a.time).then(b.id.cmp(&a.id)));

            Ok(matching
                .into_iter()
                .skip(query.effective_offset() as usize)
                .take(query.effective_limit() as usize)
                .filter_map(|e| state.composite(e.id))
                .collect())
        }

        async fn update_event(
            &self,
            ctx: &OperationContext,
            id: EventId,
            request: UpdateEventRequest,
        ) -> Result<CompositeEvent, PortError> {
            self.begin_write(ctx, "update_event")?;
            let mut state = self.state.write().await;
            let event = state
                .events
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Event", id))?;

            event.notes = request.notes.apply(event.notes.take());
            event.mood = request.mood.apply(event.mood.take());
            event.updated_at = Utc::now();

            state
                .composite(id)
                .ok_or_else(|| PortError::consistency(format!("{} vanished during update", id)))
        }

        async fn delete_event(
            &self,
            ctx: &OperationContext,
            id: EventId,
        ) -> Result<(), PortError> {
            self.begin_write(ctx, "delete_event")?;
            let mut state = self.state.write().await;
            if !state.events.contains_key(&id) {
                return Err(PortError::not_found("Event", id));
            }
            state.feedings.remove(&id);
            state.events.remove(&id);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::mock::InMemoryEventStore;
    use crate::feeding::FeedType;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn new_feeding() -> NewFeeding {
        let start = Utc.with_ymd_and_hms(2024, 1, 5, 2, 0, 0).unwrap();
        NewFeeding {
            amount: dec!(120),
            feed_type: FeedType::Bottle,
            spitup: false,
            start_time: start,
            end_time: start + Duration::minutes(15),
        }
    }

    #[test]
    fn test_patch_apply() {
        assert_eq!(Patch::Keep.apply(Some(1)), Some(1));
        assert_eq!(Patch::<i32>::Clear.apply(Some(1)), None);
        assert_eq!(Patch::Set(2).apply(None), Some(2));
    }

    #[test]
    fn test_query_defaults() {
        let query = EventQuery::by_type(EventType::Sleep);
        assert_eq!(query.effective_limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(query.effective_offset(), 0);
    }

    #[tokio::test]
    async fn test_mock_create_and_get() {
        let store = InMemoryEventStore::new();
        let ctx = OperationContext::new();

        let created = store
            .create_composite(
                &ctx,
                NewEvent::new(EventType::Feeding, Utc::now()),
                Some(NewExtension::Feeding(new_feeding())),
            )
            .await
            .unwrap();

        let fetched = store.get_event(&ctx, created.id()).await.unwrap();
        assert_eq!(fetched, created);
        assert!(fetched.check_consistency().is_ok());
    }

    #[tokio::test]
    async fn test_mock_injected_failure_writes_nothing() {
        let store = InMemoryEventStore::new();
        let ctx = OperationContext::new();
        store.fail_next_extension_write();

        let result = store
            .create_composite(
                &ctx,
                NewEvent::new(EventType::Feeding, Utc::now()),
                Some(NewExtension::Feeding(new_feeding())),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(store.event_count().await, 0);
        assert_eq!(store.feeding_count().await, 0);
    }

    #[tokio::test]
    async fn test_mock_ids_are_not_reused_after_failure() {
        let store = InMemoryEventStore::new();
        let ctx = OperationContext::new();
        store.fail_next_extension_write();
        let _ = store
            .create_composite(
                &ctx,
                NewEvent::new(EventType::Feeding, Utc::now()),
                Some(NewExtension::Feeding(new_feeding())),
            )
            .await;

        let created = store
            .create_composite(&ctx, NewEvent::new(EventType::Diaper, Utc::now()), None)
            .await
            .unwrap();
        assert_eq!(created.id(), EventId::new(2));
    }

    #[tokio::test]
    async fn test_mock_delete_not_found() {
        let store = InMemoryEventStore::new();
        let result = store.delete_event(&OperationContext::new(), EventId::new(9)).await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_mock_respects_cancellation() {
        let store = InMemoryEventStore::new();
        let ctx = OperationContext::new();
        ctx.cancel();

        let result = store
            .create_composite(&ctx, NewEvent::new(EventType::Generic, Utc::now()), None)
            .await;
        assert!(matches!(result, Err(PortError::Cancelled { .. })));
        assert_eq!(store.event_count().await, 0);
    }
}
