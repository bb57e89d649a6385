//! Database error types
//!
//! This module defines the error types that can occur during database operations.
//! `sqlx` errors are classified by PostgreSQL SQLSTATE so the coordinator can
//! tell failures worth retrying from failures that never will succeed.

use thiserror::Error;

use core_kernel::Interruption;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish or keep a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity not found in database
    #[error("{entity} with id '{id}' not found")]
    NotFound {
        entity: String,
        id: String,
    },

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Concurrent transactions could not be serialized (SQLSTATE 40001)
    #[error("Serialization failure: {0}")]
    SerializationFailure(String),

    /// Deadlock detected (SQLSTATE 40P01)
    #[error("Deadlock detected: {0}")]
    Deadlock(String),

    /// Input rejected before any statement ran
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// A row shape the coordinator guarantees did not hold
    #[error("Consistency violation: {0}")]
    Consistency(String),

    /// Transaction could not be started or committed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// The connection failed while COMMIT was in flight; the server may or
    /// may not have applied the transaction
    #[error("Commit outcome unknown: {0}")]
    CommitOutcomeUnknown(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A column could not be decoded into its Rust type
    #[error("Decode error: {0}")]
    DecodeFailed(String),

    /// Pool exhaustion - no connection became available in time
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// The caller cancelled the operation or its deadline passed
    #[error("Operation '{operation}' interrupted: {interruption}")]
    Interrupted {
        operation: String,
        interruption: Interruption,
    },
}

impl DatabaseError {
    /// Creates a not found error for a specific entity type and identifier
    ///
    /// # Example
    ///
    /// ```rust
    /// use infra_db::DatabaseError;
    ///
    /// let error = DatabaseError::not_found("Event", "EVT-12");
    /// assert!(error.to_string().contains("EVT-12"));
    /// ```
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        DatabaseError::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Checks if this error indicates a record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound { .. })
    }

    /// Reclassifies an error returned by `COMMIT`
    ///
    /// A serialization failure at commit means the server rolled back, so it
    /// stays retryable. A lost connection leaves the outcome unknown and must
    /// not be retried.
    pub fn at_commit(self) -> Self {
        if self.is_connection_error() {
            DatabaseError::CommitOutcomeUnknown(self.to_string())
        } else {
            self
        }
    }

    /// Checks if this error is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DatabaseError::DuplicateEntry(_)
                | DatabaseError::ForeignKeyViolation(_)
                | DatabaseError::ConstraintViolation(_)
        )
    }

    /// Checks if this error is a connection-related issue
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted
        )
    }

    /// Checks if the same transaction may succeed when run again
    ///
    /// Constraint violations and bad input are never transient.
    pub fn is_transient(&self) -> bool {
        self.is_connection_error()
            || matches!(
                self,
                DatabaseError::SerializationFailure(_) | DatabaseError::Deadlock(_)
            )
    }
}

/// Maps a PostgreSQL SQLSTATE to the matching error variant
///
/// See <https://www.postgresql.org/docs/current/errcodes-appendix.html>
pub fn classify_sqlstate(code: &str, message: String) -> DatabaseError {
    match code {
        "23505" => DatabaseError::DuplicateEntry(message),
        "23503" => DatabaseError::ForeignKeyViolation(message),
        "23514" => DatabaseError::ConstraintViolation(message),
        "40001" => DatabaseError::SerializationFailure(message),
        "40P01" => DatabaseError::Deadlock(message),
        // connection exceptions and server shutdown
        c if c.starts_with("08") || c == "57P01" || c == "57P02" || c == "57P03" => {
            DatabaseError::ConnectionFailed(message)
        }
        _ => DatabaseError::QueryFailed(message),
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => DatabaseError::not_found("Record", "unknown"),
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::PoolClosed => {
                DatabaseError::ConnectionFailed("connection pool is closed".to_string())
            }
            sqlx::Error::Io(e) => DatabaseError::ConnectionFailed(e.to_string()),
            sqlx::Error::Tls(e) => DatabaseError::ConnectionFailed(e.to_string()),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.code() {
                    Some(code) => classify_sqlstate(code.as_ref(), message),
                    None => DatabaseError::QueryFailed(message),
                }
            }
            e @ (sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_)) => {
                DatabaseError::DecodeFailed(e.to_string())
            }
            e => DatabaseError::QueryFailed(e.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationFailed(error.to_string())
    }
}
