//! Event domain service
//!
//! [`EventService`] is the entry point for callers. It validates every input
//! before touching the store, delegates persistence to an [`EventStorePort`],
//! and translates port failures into [`EventError`]s with a stable kind.

use std::sync::Arc;

use tracing::{debug, error, instrument, warn};

use core_kernel::{EventId, HealthCheckResult, OperationContext};

use crate::composite::{CompositeEvent, NewExtension};
use crate::error::{ErrorKind, EventError};
use crate::event::{Event, NewEvent};
use crate::feeding::{FeedingEvent, NewFeeding};
use crate::ports::{EventQuery, EventStorePort, UpdateEventRequest};
use crate::validation::EventValidator;

/// Service for recording and reading infant events
#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn EventStorePort>,
}

impl EventService {
    /// Creates a service over the given store
    pub fn new(store: Arc<dyn EventStorePort>) -> Self {
        Self { store }
    }

    /// Creates a base-only event
    ///
    /// # Errors
    ///
    /// - `Validation` if a field is out of range or the type requires an
    ///   extension (use the matching `create_and_associate_*` operation).
    ///   Nothing is written in that case.
    /// - `StoreUnavailable` if the store could not be reached.
    #[instrument(skip(self, ctx, event), fields(event_type = %event.event_type))]
    pub async fn create_event(&self, ctx: &OperationContext, event: NewEvent) -> Result<Event, EventError> {
        let created = self.compose(ctx, event, None).await?;
        Ok(created.event)
    }

    /// Creates a feeding event and its feeding extension together
    ///
    /// The feeding's `event_id` is the id generated for the base event. On
    /// any failure neither row is visible afterwards.
    #[instrument(skip(self, ctx, event, feeding))]
    pub async fn create_and_associate_feeding_event(
        &self,
        ctx: &OperationContext,
        event: NewEvent,
        feeding: NewFeeding,
    ) -> Result<FeedingEvent, EventError> {
        let created = self
            .compose(ctx, event, Some(NewExtension::Feeding(feeding)))
            .await?;
        FeedingEvent::try_from(created).map_err(|message| report(EventError::Consistency(message)))
    }

    /// Validates, then hands base and extension to the store as one write
    async fn compose(
        &self,
        ctx: &OperationContext,
        event: NewEvent,
        extension: Option<NewExtension>,
    ) -> Result<CompositeEvent, EventError> {
        let event = event.at_stored_precision();
        let extension = extension.map(NewExtension::at_stored_precision);
        EventValidator::validate_composite(&event, extension.as_ref()).into_result()?;
        debug!("Creating event");

        let created = self
            .store
            .create_composite(ctx, event, extension)
            .await
            .map_err(|e| report(EventError::from(e)))?;

        created
            .check_consistency()
            .map_err(|message| report(EventError::Consistency(message)))?;
        Ok(created)
    }

    /// Attaches a feeding to an existing feeding event that has none yet
    #[instrument(skip(self, ctx, feeding), fields(event_id = %event_id))]
    pub async fn associate_feeding(
        &self,
        ctx: &OperationContext,
        event_id: EventId,
        feeding: NewFeeding,
    ) -> Result<FeedingEvent, EventError> {
        let feeding = feeding.at_stored_precision();
        EventValidator::validate_new_feeding(&feeding).into_result()?;
        debug!("Associating feeding");

        self.store
            .associate_feeding(ctx, event_id, feeding)
            .await
            .map_err(|e| report(EventError::from(e)))
    }

    /// Reads an event joined with its extension
    #[instrument(skip(self, ctx), fields(event_id = %id))]
    pub async fn get_event(
        &self,
        ctx: &OperationContext,
        id: EventId,
    ) -> Result<CompositeEvent, EventError> {
        let found = self
            .store
            .get_event(ctx, id)
            .await
            .map_err(|e| report(EventError::from(e)))?;
        found
            .check_consistency()
            .map_err(|message| report(EventError::Consistency(message)))?;
        Ok(found)
    }

    /// Reads a feeding event
    ///
    /// Returns `Validation` when the event exists but is not a feeding.
    #[instrument(skip(self, ctx), fields(event_id = %id))]
    pub async fn get_feeding_event(
        &self,
        ctx: &OperationContext,
        id: EventId,
    ) -> Result<FeedingEvent, EventError> {
        let found = self.get_event(ctx, id).await?;
        if found.feeding().is_none() {
            return Err(EventError::validation_field(
                "event_type",
                format!("{} is a '{}' event, not a feeding", id, found.event_type()),
            ));
        }
        FeedingEvent::try_from(found).map_err(|message| report(EventError::Consistency(message)))
    }

    /// Lists events matching the query, newest first
    #[instrument(skip(self, ctx, query))]
    pub async fn list_events(
        &self,
        ctx: &OperationContext,
        query: EventQuery,
    ) -> Result<Vec<CompositeEvent>, EventError> {
        EventValidator::validate_query(&query).into_result()?;
        debug!("Listing events with query: {:?}", query);

        self.store
            .list_events(ctx, query)
            .await
            .map_err(|e| report(EventError::from(e)))
    }

    /// Changes notes and mood of an existing event
    #[instrument(skip(self, ctx, request), fields(event_id = %id))]
    pub async fn update_event(
        &self,
        ctx: &OperationContext,
        id: EventId,
        request: UpdateEventRequest,
    ) -> Result<CompositeEvent, EventError> {
        EventValidator::validate_update(&request).into_result()?;
        debug!("Updating event");

        self.store
            .update_event(ctx, id, request)
            .await
            .map_err(|e| report(EventError::from(e)))
    }

    /// Deletes an event together with its extension
    #[instrument(skip(self, ctx), fields(event_id = %id))]
    pub async fn delete_event(&self, ctx: &OperationContext, id: EventId) -> Result<(), EventError> {
        debug!("Deleting event");
        self.store
            .delete_event(ctx, id)
            .await
            .map_err(|e| report(EventError::from(e)))
    }

    /// Reports whether the backing store is reachable
    pub async fn health_check(&self) -> HealthCheckResult {
        self.store.health_check().await
    }
}

/// Logs failures the caller cannot fix by changing input
fn report(err: EventError) -> EventError {
    match err.kind() {
        ErrorKind::Consistency => error!(error = %err, "Event store invariant violated"),
        ErrorKind::StoreUnavailable => warn!(error = %err, "Event store unavailable"),
        _ => {}
    }
    err
}
