//! Event validation rules
//!
//! All input is checked here before any store call, so a rejected request
//! never opens a transaction.
//!
//! # Validation Rules
//!
//! ## Base events
//! - Notes are at most [`MAX_NOTES_CHARS`] characters (empty notes are allowed)
//! - A type that requires an extension cannot be created without one
//! - An extension must carry the same type tag as its base event
//!
//! ## Feedings
//! - Amount is non-negative and at most [`MAX_FEEDING_AMOUNT`]
//! - `start_time <= end_time`
//! - A single feeding spans at most [`MAX_FEEDING_HOURS`] hours
//!
//! ## Updates and queries
//! - An update must change at least one field
//! - A query window must be ordered and its limit at most [`MAX_PAGE_SIZE`]

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::composite::NewExtension;
use crate::error::EventError;
use crate::event::NewEvent;
use crate::feeding::NewFeeding;
use crate::ports::{EventQuery, Patch, UpdateEventRequest};

/// Longest accepted note, in characters
pub const MAX_NOTES_CHARS: usize = 2000;
/// Largest accepted feeding amount
pub const MAX_FEEDING_AMOUNT: Decimal = dec!(10000);
/// Longest accepted feeding
pub const MAX_FEEDING_HOURS: i64 = 24;
/// Largest page a list query may request
pub const MAX_PAGE_SIZE: u32 = 500;

/// A single failed rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub message: String,
}

/// Result of validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors
    pub errors: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Creates a successful validation result
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds an error to the result
    pub fn add_error(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            field,
            message: message.into(),
        });
    }

    /// Merges another validation result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }

    /// Collapses the result into a single error naming the first field
    pub fn into_result(self) -> Result<(), EventError> {
        let Some(first) = self.errors.first() else {
            return Ok(());
        };
        let field = first.field;
        let message = self
            .errors
            .iter()
            .map(|issue| format!("{}: {}", issue.field, issue.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(EventError::validation_field(field, message))
    }
}

/// Validator for event inputs
pub struct EventValidator;

impl EventValidator {
    /// Validates base fields on their own
    pub fn validate_new_event(event: &NewEvent) -> ValidationResult {
        let mut result = ValidationResult::ok();
        if let Some(notes) = &event.notes {
            Self::validate_notes(notes, &mut result);
        }
        result
    }

    /// Validates feeding fields on their own
    pub fn validate_new_feeding(feeding: &NewFeeding) -> ValidationResult {
        let mut result = ValidationResult::ok();

        if feeding.amount < Decimal::ZERO {
            result.add_error("amount", format!("must not be negative, got {}", feeding.amount));
        } else if feeding.amount > MAX_FEEDING_AMOUNT {
            result.add_error(
                "amount",
                format!("must be at most {}, got {}", MAX_FEEDING_AMOUNT, feeding.amount),
            );
        }

        match feeding.span() {
            Ok(span) => {
                if let Err(err) = span.ensure_at_most(Duration::hours(MAX_FEEDING_HOURS)) {
                    result.add_error("end_time", err.to_string());
                }
            }
            Err(err) => result.add_error("start_time", err.to_string()),
        }

        result
    }

    /// Validates a base event together with its optional extension
    ///
    /// This is the full pre-write check for a composite creation.
    pub fn validate_composite(event: &NewEvent, extension: Option<&NewExtension>) -> ValidationResult {
        let mut result = Self::validate_new_event(event);

        match extension {
            None if event.event_type.requires_extension() => {
                result.add_error(
                    "event_type",
                    format!("'{}' events must be created with their extension", event.event_type),
                );
            }
            None => {}
            Some(extension) => {
                if extension.event_type() != event.event_type {
                    result.add_error(
                        "event_type",
                        format!(
                            "'{}' extension cannot be attached to a '{}' event",
                            extension.event_type(),
                            event.event_type
                        ),
                    );
                }
                match extension {
                    NewExtension::Feeding(feeding) => result.merge(Self::validate_new_feeding(feeding)),
                }
            }
        }

        result
    }

    /// Validates a partial update
    pub fn validate_update(request: &UpdateEventRequest) -> ValidationResult {
        let mut result = ValidationResult::ok();
        if request.is_empty() {
            result.add_error("request", "update must change at least one field");
        }
        if let Patch::Set(notes) = &request.notes {
            Self::validate_notes(notes, &mut result);
        }
        result
    }

    /// Validates a list query
    pub fn validate_query(query: &EventQuery) -> ValidationResult {
        let mut result = ValidationResult::ok();
        if let (Some(from), Some(to)) = (query.window.from, query.window.to) {
            if from > to {
                result.add_error("window", "'from' must not be after 'to'");
            }
        }
        if let Some(limit) = query.limit {
            if limit == 0 || limit > MAX_PAGE_SIZE {
                result.add_error("limit", format!("must be between 1 and {}", MAX_PAGE_SIZE));
            }
        }
        result
    }

    fn validate_notes(notes: &str, result: &mut ValidationResult) {
        let length = notes.chars().count();
        if length > MAX_NOTES_CHARS {
            result.add_error(
                "notes",
                format!("must be at most {} characters, got {}", MAX_NOTES_CHARS, length),
            );
        }
    }
}
