//! Composition coordinator
//!
//! Runs every multi-statement operation on events inside one database
//! transaction. A base event and its extension are inserted, updated and
//! deleted together; on any error the transaction is rolled back, so other
//! connections see either the whole composite or nothing.
//!
//! # Transaction protocol
//!
//! 1. Input is validated before a connection is borrowed.
//! 2. `BEGIN`, then `SET TRANSACTION ISOLATION LEVEL ...` as the first statement.
//! 3. The work closure runs against the transaction's connection.
//! 4. `COMMIT` on success. On error the transaction is dropped, which rolls
//!    it back and returns the connection to the pool.
//!
//! The attempt runs under [`OperationContext::guard`]. If the caller cancels
//! or the deadline passes mid-transaction, the in-flight future is dropped
//! with the same rollback. Transient failures (lost connection, pool timeout,
//! serialization failure, deadlock) are retried with exponential backoff.
//! A connection lost during `COMMIT` is not: the server may already have
//! applied the transaction.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use tracing::{debug, error, instrument, warn};

use core_kernel::{millis, EventId, Interruption, OperationContext, RetryPolicy};
use domain_events::{
    CompositeEvent, EventError, EventQuery, EventType, EventValidator, FeedingEvent, NewEvent,
    NewExtension, NewFeeding, UpdateEventRequest,
};

use crate::error::DatabaseError;
use crate::pool::DatabasePool;
use crate::repositories::event::{
    compose, EventFilter, EventRepository, MoodType, NewEventRow, NewFeedingRow,
};

/// Future returned by one transactional unit of work
pub type TxFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T, DatabaseError>> + Send + 'c>>;

/// Isolation level applied to every coordinator transaction
///
/// PostgreSQL never shows uncommitted rows to other sessions, so even
/// `ReadCommitted` keeps a half-written composite invisible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionIsolation {
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl TransactionIsolation {
    /// Statement that sets this level; must be the first in the transaction
    pub fn set_statement(&self) -> &'static str {
        match self {
            TransactionIsolation::ReadCommitted => "SET TRANSACTION ISOLATION LEVEL READ COMMITTED",
            TransactionIsolation::RepeatableRead => "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ",
            TransactionIsolation::Serializable => "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionIsolation::ReadCommitted => "read_committed",
            TransactionIsolation::RepeatableRead => "repeatable_read",
            TransactionIsolation::Serializable => "serializable",
        }
    }
}

impl fmt::Display for TransactionIsolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionIsolation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "read_committed" => Ok(TransactionIsolation::ReadCommitted),
            "repeatable_read" => Ok(TransactionIsolation::RepeatableRead),
            "serializable" => Ok(TransactionIsolation::Serializable),
            other => Err(format!("unknown isolation level '{}'", other)),
        }
    }
}

/// Owns the pool and runs composite writes atomically
#[derive(Debug, Clone)]
pub struct CompositionCoordinator {
    pool: DatabasePool,
    repository: EventRepository,
    retry: RetryPolicy,
    isolation: TransactionIsolation,
}

impl CompositionCoordinator {
    /// Creates a coordinator with the default retry policy and isolation
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            pool,
            repository: EventRepository::new(),
            retry: RetryPolicy::default(),
            isolation: TransactionIsolation::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_isolation(mut self, isolation: TransactionIsolation) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn isolation(&self) -> TransactionIsolation {
        self.isolation
    }

    /// Runs `work` in a transaction, retrying transient failures
    ///
    /// `work` may be called more than once, so it must rebuild its future
    /// from owned inputs on every call.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let count = coordinator
    ///     .in_transaction(&ctx, "count_events", |conn| {
    ///         Box::pin(async move {
    ///             let n: i64 = sqlx::query_scalar("SELECT count(*) FROM events")
    ///                 .fetch_one(&mut *conn)
    ///                 .await?;
    ///             Ok::<_, DatabaseError>(n)
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn in_transaction<T, F>(
        &self,
        ctx: &OperationContext,
        operation: &'static str,
        mut work: F,
    ) -> Result<T, DatabaseError>
    where
        T: Send,
        F: for<'c> FnMut(&'c mut PgConnection) -> TxFuture<'c, T> + Send,
    {
        let mut retries = 0u32;
        loop {
            let outcome = ctx
                .guard(self.attempt(&mut work))
                .await
                .map_err(|interruption| interrupted(operation, interruption))?;

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && self.retry.allows(retries + 1) => {
                    retries += 1;
                    let delay = self.retry.delay_for(retries);
                    warn!(
                        operation,
                        retry = retries,
                        delay_ms = millis(delay),
                        error = %err,
                        "Transaction rolled back on transient failure, retrying"
                    );
                    ctx.sleep(delay)
                        .await
                        .map_err(|interruption| interrupted(operation, interruption))?;
                }
                Err(err) => {
                    if err.is_transient() {
                        warn!(operation, retries, error = %err, "Transaction failed, retries exhausted");
                    } else {
                        debug!(operation, error = %err, "Transaction rolled back");
                    }
                    return Err(err);
                }
            }
        }
    }

    async fn attempt<T, F>(&self, work: &mut F) -> Result<T, DatabaseError>
    where
        F: for<'c> FnMut(&'c mut PgConnection) -> TxFuture<'c, T>,
    {
        let mut tx = self.pool.begin().await?;
        sqlx::query(self.isolation.set_statement())
            .execute(&mut *tx)
            .await?;

        let value = work(&mut *tx).await?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::from(e).at_commit())?;
        Ok(value)
    }

    /// Inserts a base event and its optional extension atomically
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if validation fails or the extension's type tag does
    ///   not match the event; no connection is used.
    /// - `Consistency` if the extension could not reference the new base row.
    /// - Any database error after retries; nothing is committed.
    #[instrument(skip(self, ctx, event, extension), fields(event_type = %event.event_type))]
    pub async fn create_composite(
        &self,
        ctx: &OperationContext,
        event: NewEvent,
        extension: Option<NewExtension>,
    ) -> Result<CompositeEvent, DatabaseError> {
        EventValidator::validate_composite(&event, extension.as_ref())
            .into_result()
            .map_err(rejected)?;

        let repository = self.repository;
        let base = NewEventRow::from(&event);
        let feeding = extension.as_ref().map(|ext| match ext {
            NewExtension::Feeding(feeding) => NewFeedingRow::from(feeding),
        });

        self.in_transaction(ctx, "create_composite", move |conn| {
            Box::pin(insert_composite(repository, conn, base.clone(), feeding.clone()))
        })
        .await
    }

    /// Attaches a feeding to an existing feeding event
    ///
    /// The base row is locked for the duration of the transaction.
    #[instrument(skip(self, ctx, feeding), fields(event_id = %event_id))]
    pub async fn associate_feeding(
        &self,
        ctx: &OperationContext,
        event_id: EventId,
        feeding: NewFeeding,
    ) -> Result<FeedingEvent, DatabaseError> {
        EventValidator::validate_new_feeding(&feeding)
            .into_result()
            .map_err(rejected)?;

        let repository = self.repository;
        let feeding = NewFeedingRow::from(&feeding);

        self.in_transaction(ctx, "associate_feeding", move |conn| {
            Box::pin(attach_feeding(repository, conn, event_id, feeding.clone()))
        })
        .await
    }

    /// Reads one event joined with its extension
    #[instrument(skip(self, ctx), fields(event_id = %id))]
    pub async fn get_event(
        &self,
        ctx: &OperationContext,
        id: EventId,
    ) -> Result<CompositeEvent, DatabaseError> {
        let repository = self.repository;
        self.in_transaction(ctx, "get_event", move |conn| {
            Box::pin(fetch_composite(repository, conn, id))
        })
        .await
    }

    /// Lists events matching the query, newest first
    #[instrument(skip(self, ctx, query))]
    pub async fn list_events(
        &self,
        ctx: &OperationContext,
        query: &EventQuery,
    ) -> Result<Vec<CompositeEvent>, DatabaseError> {
        let repository = self.repository;
        let filter = EventFilter::from(query);

        self.in_transaction(ctx, "list_events", move |conn| {
            Box::pin(fetch_composites(repository, conn, filter.clone()))
        })
        .await
    }

    /// Changes notes and mood; the type and extension stay as they are
    #[instrument(skip(self, ctx, request), fields(event_id = %id))]
    pub async fn update_event(
        &self,
        ctx: &OperationContext,
        id: EventId,
        request: UpdateEventRequest,
    ) -> Result<CompositeEvent, DatabaseError> {
        EventValidator::validate_update(&request)
            .into_result()
            .map_err(rejected)?;

        let repository = self.repository;
        self.in_transaction(ctx, "update_event", move |conn| {
            Box::pin(patch_event(repository, conn, id, request.clone()))
        })
        .await
    }

    /// Deletes the extension and then the base event in one transaction
    #[instrument(skip(self, ctx), fields(event_id = %id))]
    pub async fn delete_event(&self, ctx: &OperationContext, id: EventId) -> Result<(), DatabaseError> {
        let repository = self.repository;
        self.in_transaction(ctx, "delete_event", move |conn| {
            Box::pin(remove_event(repository, conn, id))
        })
        .await
    }
}

// ============================================================================
// Transaction bodies
// ============================================================================

async fn insert_composite(
    repository: EventRepository,
    conn: &mut PgConnection,
    base: NewEventRow,
    feeding: Option<NewFeedingRow>,
) -> Result<CompositeEvent, DatabaseError> {
    let event_row = repository.insert_event(conn, &base).await?;
    let event_id = EventId::new(event_row.id);
    debug!(%event_id, "Inserted base event");

    let feeding_row = match feeding {
        Some(feeding) => {
            let row = repository
                .insert_feeding(conn, event_id, &feeding)
                .await
                .map_err(|e| orphaned_extension(event_id, e))?;
            if row.event_id != event_row.id {
                return Err(broken_invariant(format!(
                    "feeding references EVT-{} but base is {}",
                    row.event_id, event_id
                )));
            }
            debug!(%event_id, "Inserted feeding extension");
            Some(row)
        }
        None => None,
    };

    Ok(compose(event_row, feeding_row))
}

async fn attach_feeding(
    repository: EventRepository,
    conn: &mut PgConnection,
    event_id: EventId,
    feeding: NewFeedingRow,
) -> Result<FeedingEvent, DatabaseError> {
    let event_row = repository
        .lock_event(conn, event_id)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Event", event_id))?;

    let event_type = EventType::from(event_row.event_type);
    if event_type != EventType::Feeding {
        return Err(DatabaseError::invalid_input(
            "event_type",
            format!("{} is a '{}' event, not a feeding", event_id, event_type),
        ));
    }

    let feeding_row = repository
        .insert_feeding(conn, event_id, &feeding)
        .await
        .map_err(|e| match e {
            DatabaseError::DuplicateEntry(_) => {
                DatabaseError::DuplicateEntry(format!("{} already has a feeding", event_id))
            }
            other => orphaned_extension(event_id, other),
        })?;

    FeedingEvent::try_new(event_row.into_event(), feeding_row.into_feeding()).map_err(broken_invariant)
}

async fn fetch_composite(
    repository: EventRepository,
    conn: &mut PgConnection,
    id: EventId,
) -> Result<CompositeEvent, DatabaseError> {
    repository
        .find_with_extension(conn, id)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Event", id))?
        .into_composite()
}

async fn fetch_composites(
    repository: EventRepository,
    conn: &mut PgConnection,
    filter: EventFilter,
) -> Result<Vec<CompositeEvent>, DatabaseError> {
    repository
        .list_with_extension(conn, &filter)
        .await?
        .into_iter()
        .map(|row| row.into_composite())
        .collect()
}

async fn patch_event(
    repository: EventRepository,
    conn: &mut PgConnection,
    id: EventId,
    request: UpdateEventRequest,
) -> Result<CompositeEvent, DatabaseError> {
    let current = repository
        .lock_event(conn, id)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Event", id))?;

    let notes = request.notes.apply(current.notes);
    let mood = request
        .mood
        .apply(current.mood.map(Into::into))
        .map(MoodType::from);

    repository
        .update_event(conn, id, notes.as_deref(), mood)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Event", id))?;

    repository
        .find_with_extension(conn, id)
        .await?
        .ok_or_else(|| broken_invariant(format!("{} vanished while locked", id)))?
        .into_composite()
}

async fn remove_event(
    repository: EventRepository,
    conn: &mut PgConnection,
    id: EventId,
) -> Result<(), DatabaseError> {
    let feedings = repository.delete_feeding(conn, id).await?;
    let events = repository.delete_event(conn, id).await?;
    if events == 0 {
        return Err(DatabaseError::not_found("Event", id));
    }
    debug!(%id, feedings, "Deleted event");
    Ok(())
}

fn interrupted(operation: &'static str, interruption: Interruption) -> DatabaseError {
    warn!(operation, %interruption, "Transaction abandoned, rolled back");
    DatabaseError::Interrupted {
        operation: operation.to_string(),
        interruption,
    }
}

fn rejected(err: EventError) -> DatabaseError {
    match err {
        EventError::Validation { message, field } => DatabaseError::InvalidInput { message, field },
        other => DatabaseError::InvalidInput {
            message: other.to_string(),
            field: None,
        },
    }
}

fn broken_invariant(message: impl Into<String>) -> DatabaseError {
    let message = message.into();
    error!(%message, "Composite invariant violated");
    DatabaseError::Consistency(message)
}

/// An extension insert that cannot see its parent is a coordinator defect
fn orphaned_extension(event_id: EventId, err: DatabaseError) -> DatabaseError {
    match err {
        DatabaseError::ForeignKeyViolation(message) => {
            broken_invariant(format!("extension for {} has no parent: {}", event_id, message))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{create_lazy_pool, DatabaseConfig};

    #[test]
    fn test_isolation_statements() {
        assert_eq!(
            TransactionIsolation::default().set_statement(),
            "SET TRANSACTION ISOLATION LEVEL READ COMMITTED"
        );
        assert_eq!(
            TransactionIsolation::Serializable.set_statement(),
            "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE"
        );
    }

    #[test]
    fn test_isolation_parsing() {
        assert_eq!(
            "repeatable read".parse::<TransactionIsolation>().unwrap(),
            TransactionIsolation::RepeatableRead
        );
        assert_eq!(
            "SERIALIZABLE".parse::<TransactionIsolation>().unwrap(),
            TransactionIsolation::Serializable
        );
        assert!("snapshot".parse::<TransactionIsolation>().is_err());
    }

    #[test]
    fn test_validation_error_keeps_field() {
        let err = rejected(EventError::validation_field("amount", "negative"));
        assert!(matches!(
            err,
            DatabaseError::InvalidInput { field: Some(ref f), .. } if f == "amount"
        ));
    }

    #[test]
    fn test_foreign_key_on_extension_is_consistency_error() {
        let err = orphaned_extension(EventId::new(3), DatabaseError::ForeignKeyViolation("fk".into()));
        assert!(matches!(err, DatabaseError::Consistency(_)));

        let err = orphaned_extension(EventId::new(3), DatabaseError::PoolExhausted);
        assert!(matches!(err, DatabaseError::PoolExhausted));
    }

    fn unreachable_coordinator(retry: RetryPolicy) -> CompositionCoordinator {
        let config = DatabaseConfig::new("postgres://nobody@127.0.0.1:1/none")
            .min_connections(0)
            .connect_timeout(std::time::Duration::from_millis(200));
        let pool = create_lazy_pool(&config).unwrap();
        CompositionCoordinator::new(pool).with_retry_policy(retry)
    }

    #[tokio::test]
    async fn test_invalid_input_never_borrows_a_connection() {
        let coordinator = unreachable_coordinator(RetryPolicy::none());
        let event = NewEvent::new(EventType::Feeding, chrono::Utc::now());

        let err = coordinator
            .create_composite(&OperationContext::new(), event, None)
            .await
            .unwrap_err();

        assert!(matches!(err, DatabaseError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_retried_then_reported() {
        let retry = RetryPolicy {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
        };
        let coordinator = unreachable_coordinator(retry);

        let err = coordinator
            .get_event(&OperationContext::new(), EventId::new(1))
            .await
            .unwrap_err();

        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_cancelled_context_stops_before_begin() {
        let coordinator = unreachable_coordinator(RetryPolicy::default());
        let ctx = OperationContext::new();
        ctx.cancel();

        let err = coordinator.get_event(&ctx, EventId::new(1)).await.unwrap_err();

        assert!(matches!(
            err,
            DatabaseError::Interrupted { interruption: Interruption::Cancelled, .. }
        ));
    }
}
