//! Shared vocabulary for store ports and their adapters
//!
//! Domain crates define port traits (`EventStorePort`); infrastructure crates
//! implement them. Both sides speak `PortError`, so the service layer can map
//! a failure to a caller-facing kind without knowing which adapter raised it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Failure reported by a port implementation
#[derive(Debug, Error)]
pub enum PortError {
    #[error("{entity_type} {id} not found")]
    NotFound { entity_type: String, id: String },

    /// Input the adapter refused before touching storage
    #[error("invalid input: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// A uniqueness rule held by the store would be broken
    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("store unreachable: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("{operation} exceeded its {duration_ms}ms budget")]
    Timeout { operation: String, duration_ms: u64 },

    #[error("{operation} cancelled by caller")]
    Cancelled { operation: String },

    /// Data read back from the store contradicts the model, e.g. an
    /// extension whose parent has the wrong type
    #[error("inconsistent store state: {message}")]
    Consistency { message: String },

    #[error("internal store error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl PortError {
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Validation failure pinned to one input field
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Connection loss and timeouts may clear up on their own; nothing else does
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Bound shared by every port trait so adapters can sit behind `Arc<dyn _>`
pub trait DomainPort: Send + Sync + 'static {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    Unhealthy,
}

/// Outcome of one liveness probe against an adapter's backing store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub adapter_id: String,
    pub status: AdapterHealth,
    /// Round-trip time of the probe
    pub latency_ms: u64,
    /// Failure detail when unhealthy
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthCheckResult {
    pub fn is_healthy(&self) -> bool {
        self.status == AdapterHealth::Healthy
    }
}

#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}

/// Who asked for an operation, carried into tracing spans
#[derive(Debug, Clone, Default)]
pub struct OperationMetadata {
    pub correlation_id: Option<String>,
    /// Caregiver recording the event, when the caller knows it
    pub caregiver: Option<String>,
}

impl OperationMetadata {
    pub fn with_correlation_id(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(correlation_id.into()),
            ..Self::default()
        }
    }

    /// Metadata with a fresh UUIDv7 correlation id
    pub fn generated() -> Self {
        Self::with_correlation_id(uuid::Uuid::now_v7().to_string())
    }

    pub fn recorded_by(mut self, caregiver: impl Into<String>) -> Self {
        self.caregiver = Some(caregiver.into());
        self
    }
}
