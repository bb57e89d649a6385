//! Event domain errors
//!
//! Every failure an [`crate::EventService`] operation can report maps onto one
//! stable [`ErrorKind`]. Callers branch on the kind; the message is for humans.

use std::fmt;

use thiserror::Error;

use core_kernel::{EventId, PortError, TemporalError};

use crate::event::UnknownVariant;

/// Stable, machine-readable error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    StoreUnavailable,
    Consistency,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::Consistency => "consistency_error",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in the event domain
#[derive(Debug, Error)]
pub enum EventError {
    /// Malformed or out-of-range input; detected before any write
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// No event with the given id exists
    #[error("Event not found: {0}")]
    NotFound(String),

    /// A uniqueness rule was violated, e.g. a second extension for one event
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The store could not be reached, timed out, or kept deadlocking
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// An invariant the store is responsible for was broken
    #[error("Consistency violation: {0}")]
    Consistency(String),

    /// The caller cancelled the operation
    #[error("Operation cancelled: {0}")]
    Cancelled(String),
}

impl EventError {
    pub fn validation(message: impl Into<String>) -> Self {
        EventError::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn validation_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        EventError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn not_found(id: EventId) -> Self {
        EventError::NotFound(id.to_string())
    }

    /// Stable classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EventError::Validation { .. } => ErrorKind::Validation,
            EventError::NotFound(_) => ErrorKind::NotFound,
            EventError::Conflict(_) => ErrorKind::Conflict,
            EventError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            EventError::Consistency(_) => ErrorKind::Consistency,
            EventError::Cancelled(_) => ErrorKind::Cancelled,
        }
    }

    /// The offending field, for validation errors that name one
    pub fn field(&self) -> Option<&str> {
        match self {
            EventError::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}

impl From<PortError> for EventError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => {
                EventError::NotFound(format!("{} {}", entity_type, id))
            }
            PortError::Validation { message, field } => EventError::Validation { message, field },
            PortError::Conflict { message } => EventError::Conflict(message),
            PortError::Connection { message, .. } => EventError::StoreUnavailable(message),
            PortError::Timeout { operation, duration_ms } => EventError::StoreUnavailable(
                format!("{} timed out after {}ms", operation, duration_ms),
            ),
            PortError::Cancelled { operation } => EventError::Cancelled(operation),
            PortError::Consistency { message } => EventError::Consistency(message),
            PortError::Internal { message, .. } => EventError::Consistency(message),
        }
    }
}

impl From<UnknownVariant> for EventError {
    fn from(error: UnknownVariant) -> Self {
        EventError::Validation {
            field: Some(error.kind.replace(' ', "_")),
            message: error.to_string(),
        }
    }
}

impl From<TemporalError> for EventError {
    fn from(error: TemporalError) -> Self {
        EventError::validation(error.to_string())
    }
}
