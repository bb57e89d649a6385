//! Cancellation-aware operation context
//!
//! Every port and service operation receives an [`OperationContext`]. It
//! carries tracing metadata, an explicit cancellation token and an optional
//! deadline. Adapters wrap their work in [`OperationContext::guard`], which
//! drops the in-flight future as soon as either signal fires; dropping a
//! database transaction that way rolls it back and releases the connection.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::ports::{OperationMetadata, PortError};

/// Why a guarded operation stopped early
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum Interruption {
    #[error("operation was cancelled")]
    Cancelled,

    #[error("deadline of {budget_ms}ms exceeded")]
    DeadlineExceeded {
        budget_ms: u64,
    },
}

impl Interruption {
    /// Converts the interruption into the matching port error
    pub fn into_port_error(self, operation: impl Into<String>) -> PortError {
        match self {
            Interruption::Cancelled => PortError::Cancelled {
                operation: operation.into(),
            },
            Interruption::DeadlineExceeded { budget_ms } => PortError::Timeout {
                operation: operation.into(),
                duration_ms: budget_ms,
            },
        }
    }
}

/// Per-operation context passed from the caller into every operation
#[derive(Debug, Clone)]
pub struct OperationContext {
    metadata: OperationMetadata,
    cancellation: CancellationToken,
    deadline: Option<Instant>,
    budget: Option<Duration>,
}

impl Default for OperationContext {
    fn default() -> Self {
        Self {
            metadata: OperationMetadata::default(),
            cancellation: CancellationToken::new(),
            deadline: None,
            budget: None,
        }
    }
}

impl OperationContext {
    /// Creates a context with no deadline and a fresh cancellation token
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches tracing metadata
    pub fn with_metadata(mut self, metadata: OperationMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets a deadline `timeout` from now
    ///
    /// A timeout too large to represent as an instant means no deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self.budget = self.deadline.map(|_| timeout);
        self
    }

    /// Uses an externally owned cancellation token (e.g. a request scope)
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Derives a context whose token is cancelled together with this one
    pub fn child(&self) -> Self {
        Self {
            metadata: self.metadata.clone(),
            cancellation: self.cancellation.child_token(),
            deadline: self.deadline,
            budget: self.budget,
        }
    }

    /// Cancels this context and every child derived from it
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn metadata(&self) -> &OperationMetadata {
        &self.metadata
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.metadata.correlation_id.as_deref()
    }

    /// Time left before the deadline, if one is set
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns the interruption if the context is already cancelled or expired
    pub fn check(&self) -> Option<Interruption> {
        if self.cancellation.is_cancelled() {
            return Some(Interruption::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(self.deadline_exceeded()),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.check().is_some()
    }

    /// Resolves when the token is cancelled or the deadline passes
    pub async fn interrupted(&self) -> Interruption {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.cancellation.cancelled() => Interruption::Cancelled,
                _ = tokio::time::sleep_until(deadline) => self.deadline_exceeded(),
            },
            None => {
                self.cancellation.cancelled().await;
                Interruption::Cancelled
            }
        }
    }

    /// Runs `fut` to completion unless the context is interrupted first
    ///
    /// On interruption the future is dropped before this returns.
    pub async fn guard<F>(&self, fut: F) -> Result<F::Output, Interruption>
    where
        F: Future,
    {
        if let Some(interruption) = self.check() {
            return Err(interruption);
        }
        tokio::select! {
            biased;
            interruption = self.interrupted() => Err(interruption),
            output = fut => Ok(output),
        }
    }

    /// Sleeps for `delay`, returning early with the interruption if one fires
    pub async fn sleep(&self, delay: Duration) -> Result<(), Interruption> {
        self.guard(tokio::time::sleep(delay)).await
    }

    fn deadline_exceeded(&self) -> Interruption {
        Interruption::DeadlineExceeded {
            budget_ms: self.budget.map_or(0, millis),
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_completes_without_signals() {
        let ctx = OperationContext::new();
        let value = ctx.guard(async { 5 }).await;
        assert_eq!(value, Ok(5));
    }

    #[tokio::test]
    async fn test_guard_returns_cancelled() {
        let ctx = OperationContext::new();
        ctx.cancel();
        let result = ctx.guard(std::future::pending::<()>()).await;
        assert_eq!(result, Err(Interruption::Cancelled));
    }

    #[tokio::test]
    async fn test_guard_returns_deadline_exceeded() {
        let ctx = OperationContext::new().with_timeout(Duration::from_millis(50));
        let result = ctx.guard(std::future::pending::<()>()).await;
        assert_eq!(result, Err(Interruption::DeadlineExceeded { budget_ms: 50 }));
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_means_no_deadline() {
        let ctx = OperationContext::new().with_timeout(Duration::MAX);
        assert_eq!(ctx.remaining(), None);
        assert_eq!(ctx.check(), None);
        assert_eq!(ctx.guard(async { 1 }).await, Ok(1));
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(250)), 250);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_child_cancelled_with_parent() {
        let parent = OperationContext::new();
        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_interruption_maps_to_port_error() {
        let error = Interruption::Cancelled.into_port_error("get_event");
        assert!(matches!(error, PortError::Cancelled { .. }));

        let error = Interruption::DeadlineExceeded { budget_ms: 10 }.into_port_error("get_event");
        assert!(error.is_transient());
    }
}
