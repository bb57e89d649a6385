//! PostgreSQL Event Store Adapter
//!
//! This module provides the production implementation of the
//! `EventStorePort` trait, delegating every operation to the
//! [`CompositionCoordinator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{CompositionCoordinator, PostgresEventStore};
//! use domain_events::{EventService, EventStorePort};
//! use std::sync::Arc;
//!
//! let store: Arc<dyn EventStorePort> = Arc::new(PostgresEventStore::new(CompositionCoordinator::new(pool)));
//! let service = EventService::new(store);
//! ```

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, instrument};

use core_kernel::{
    millis, AdapterHealth, DomainPort, EventId, HealthCheckResult, HealthCheckable, OperationContext,
    PortError,
};
use domain_events::{
    CompositeEvent, EventQuery, EventStorePort, FeedingEvent, NewEvent, NewExtension, NewFeeding,
    UpdateEventRequest,
};

use crate::coordinator::CompositionCoordinator;
use crate::error::DatabaseError;

const ADAPTER_ID: &str = "postgres-event-store";

/// PostgreSQL-backed implementation of the EventStorePort trait
///
/// # Error Handling
///
/// Database errors are translated to `PortError` variants:
/// - `NotFound` -> `PortError::NotFound`
/// - `InvalidInput`, check violations -> `PortError::Validation`
/// - `DuplicateEntry` -> `PortError::Conflict`
/// - connection, pool, serialization and deadlock failures, and an unknown
///   commit outcome -> `PortError::Connection`
/// - `Consistency`, foreign key violations -> `PortError::Consistency`
/// - `Interrupted` -> `PortError::Cancelled` or `PortError::Timeout`
/// - Other errors -> `PortError::Internal`
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    coordinator: CompositionCoordinator,
}

impl PostgresEventStore {
    pub fn new(coordinator: CompositionCoordinator) -> Self {
        Self { coordinator }
    }

    /// Returns the coordinator backing this store
    pub fn coordinator(&self) -> &CompositionCoordinator {
        &self.coordinator
    }
}

impl DomainPort for PostgresEventStore {}

#[async_trait]
impl HealthCheckable for PostgresEventStore {
    /// Checks database connectivity
    ///
    /// Performs a simple SELECT 1 query to verify the connection pool
    /// is operational and the database is responsive.
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(self.coordinator.pool())
            .await;

        let latency_ms = millis(start.elapsed());

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl EventStorePort for PostgresEventStore {
    #[instrument(skip(self, ctx, event, extension), fields(correlation_id = ctx.correlation_id()))]
    async fn create_composite(
        &self,
        ctx: &OperationContext,
        event: NewEvent,
        extension: Option<NewExtension>,
    ) -> Result<CompositeEvent, PortError> {
        debug!("Creating composite event");
        self.coordinator
            .create_composite(ctx, event, extension)
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self, ctx, feeding), fields(event_id = %event_id))]
    async fn associate_feeding(
        &self,
        ctx: &OperationContext,
        event_id: EventId,
        feeding: NewFeeding,
    ) -> Result<FeedingEvent, PortError> {
        self.coordinator
            .associate_feeding(ctx, event_id, feeding)
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self, ctx), fields(event_id = %id))]
    async fn get_event(
        &self,
        ctx: &OperationContext,
        id: EventId,
    ) -> Result<CompositeEvent, PortError> {
        self.coordinator
            .get_event(ctx, id)
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self, ctx, query))]
    async fn list_events(
        &self,
        ctx: &OperationContext,
        query: EventQuery,
    ) -> Result<Vec<CompositeEvent>, PortError> {
        debug!("Listing events with query: {:?}", query);
        self.coordinator
            .list_events(ctx, &query)
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self, ctx, request), fields(event_id = %id))]
    async fn update_event(
        &self,
        ctx: &OperationContext,
        id: EventId,
        request: UpdateEventRequest,
    ) -> Result<CompositeEvent, PortError> {
        self.coordinator
            .update_event(ctx, id, request)
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self, ctx), fields(event_id = %id))]
    async fn delete_event(&self, ctx: &OperationContext, id: EventId) -> Result<(), PortError> {
        self.coordinator
            .delete_event(ctx, id)
            .await
            .map_err(db_to_port_error)
    }
}

// =============================================================================
// Conversion Functions
// =============================================================================

/// Converts a database error to a port error
pub fn db_to_port_error(e: DatabaseError) -> PortError {
    match e {
        DatabaseError::NotFound { entity, id } => PortError::NotFound {
            entity_type: entity,
            id,
        },
        DatabaseError::InvalidInput { message, field } => PortError::Validation { message, field },
        DatabaseError::ConstraintViolation(message) => PortError::Validation {
            message,
            field: None,
        },
        DatabaseError::DuplicateEntry(message) => PortError::Conflict { message },
        DatabaseError::ForeignKeyViolation(message) | DatabaseError::Consistency(message) => {
            PortError::Consistency { message }
        }
        DatabaseError::Interrupted {
            operation,
            interruption,
        } => interruption.into_port_error(operation),
        e @ DatabaseError::CommitOutcomeUnknown(_) => PortError::Connection {
            message: e.to_string(),
            source: Some(Box::new(e)),
        },
        e if e.is_transient() => PortError::Connection {
            message: e.to_string(),
            source: Some(Box::new(e)),
        },
        e => PortError::Internal {
            message: e.to_string(),
            source: Some(Box::new(e)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Interruption;

    #[test]
    fn test_error_translation() {
        assert!(db_to_port_error(DatabaseError::not_found("Event", "EVT-1")).is_not_found());
        assert!(matches!(
            db_to_port_error(DatabaseError::DuplicateEntry("dup".into())),
            PortError::Conflict { .. }
        ));
        assert!(matches!(
            db_to_port_error(DatabaseError::invalid_input("amount", "negative")),
            PortError::Validation { field: Some(_), .. }
        ));
        assert!(matches!(
            db_to_port_error(DatabaseError::ForeignKeyViolation("fk".into())),
            PortError::Consistency { .. }
        ));
        assert!(db_to_port_error(DatabaseError::Deadlock("40P01".into())).is_transient());
        assert!(matches!(
            db_to_port_error(DatabaseError::QueryFailed("syntax".into())),
            PortError::Internal { .. }
        ));
    }

    #[test]
    fn test_unknown_commit_outcome_reports_store_unavailable() {
        let error = db_to_port_error(DatabaseError::CommitOutcomeUnknown("reset".into()));
        assert!(matches!(error, PortError::Connection { .. }));
    }

    #[test]
    fn test_interruptions_keep_their_kind() {
        let cancelled = db_to_port_error(DatabaseError::Interrupted {
            operation: "get_event".into(),
            interruption: Interruption::Cancelled,
        });
        assert!(matches!(cancelled, PortError::Cancelled { .. }));

        let expired = db_to_port_error(DatabaseError::Interrupted {
            operation: "get_event".into(),
            interruption: Interruption::DeadlineExceeded { budget_ms: 100 },
        });
        assert!(matches!(expired, PortError::Timeout { duration_ms: 100, .. }));
    }
}
