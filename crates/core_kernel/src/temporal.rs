//! Temporal value types
//!
//! An event describes *when something happened*, which is distinct from when
//! the row was written. Intervals such as a feeding's start and end are
//! carried as a [`TimeSpan`], which can only be built in order.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Digits of sub-second precision PostgreSQL keeps for `timestamptz`
pub const STORED_SUBSEC_DIGITS: u16 = 6;

/// Truncates `timestamp` to the microsecond precision every store keeps
///
/// Applied to event times before they are written so a read returns exactly
/// the instant that was stored, whichever store holds it.
pub fn to_stored_precision(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(STORED_SUBSEC_DIGITS)
}

/// Errors related to temporal values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid span: start {start} is after end {end}")]
    InvalidSpan {
        start: String,
        end: String,
    },

    #[error("Span of {actual_minutes} minutes exceeds the maximum of {max_minutes} minutes")]
    SpanTooLong {
        actual_minutes: i64,
        max_minutes: i64,
    },
}

/// A closed interval `[start, end]` with `start <= end`
///
/// Zero-length spans are allowed; a feeding recorded at a single instant is
/// still a valid span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpan {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeSpan {
    /// Creates a span, rejecting `start > end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidSpan {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// Creates a zero-length span at `at`
    pub fn instant(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the span
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns true if `timestamp` lies within the span (both ends inclusive)
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }

    /// Rejects spans longer than `max`
    pub fn ensure_at_most(&self, max: Duration) -> Result<(), TemporalError> {
        if self.duration() > max {
            return Err(TemporalError::SpanTooLong {
                actual_minutes: self.duration().num_minutes(),
                max_minutes: max.num_minutes(),
            });
        }
        Ok(())
    }
}

/// A half-open time window `[from, to)` used for range queries
///
/// Either bound may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Result<Self, TemporalError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(TemporalError::InvalidSpan {
                    start: from.to_rfc3339(),
                    end: to.to_rfc3339(),
                });
            }
        }
        Ok(Self { from, to })
    }

    /// Returns true if `timestamp` falls inside the window
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| timestamp >= from)
            && self.to.map_or(true, |to| timestamp < to)
    }
}
