//! Event repository implementation
//!
//! The statement set for base events and their feeding extensions. Every
//! method runs on a connection borrowed from the caller's transaction and
//! never begins, commits or rolls back on its own; atomicity across
//! statements is the coordinator's job.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;

use core_kernel::{to_stored_precision, EventId};
use domain_events as domain;

use crate::error::DatabaseError;

const EVENT_COLUMNS: &str = "id, event_type, time, notes, mood, created_at, updated_at";

const FEEDING_COLUMNS: &str = "event_id, amount, feed_type, spitup, start_time, end_time, created_at";

const JOINED_SELECT: &str = r#"
    SELECT
        e.id, e.event_type, e.time, e.notes, e.mood, e.created_at, e.updated_at,
        f.event_id AS feeding_event_id,
        f.amount AS feeding_amount,
        f.feed_type AS feeding_feed_type,
        f.spitup AS feeding_spitup,
        f.start_time AS feeding_start_time,
        f.end_time AS feeding_end_time,
        f.created_at AS feeding_created_at
    FROM events e
    LEFT JOIN feeding_events f ON f.event_id = e.id
"#;

/// Stateless statement set for the `events` and `feeding_events` tables
#[derive(Debug, Clone, Copy, Default)]
pub struct EventRepository;

impl EventRepository {
    pub fn new() -> Self {
        Self
    }

    /// Inserts a base event and returns it with its generated id
    pub async fn insert_event(
        &self,
        conn: &mut PgConnection,
        event: &NewEventRow,
    ) -> Result<EventRow, DatabaseError> {
        let sql = format!(
            "INSERT INTO events (event_type, time, notes, mood) VALUES ($1, $2, $3, $4) RETURNING {}",
            EVENT_COLUMNS
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(event.event_type)
            .bind(event.time)
            .bind(event.notes.as_deref())
            .bind(event.mood)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row)
    }

    /// Inserts the feeding extension for `event_id`
    ///
    /// A second feeding for the same event fails with `DuplicateEntry`; a
    /// missing parent fails with `ForeignKeyViolation`.
    pub async fn insert_feeding(
        &self,
        conn: &mut PgConnection,
        event_id: EventId,
        feeding: &NewFeedingRow,
    ) -> Result<FeedingRow, DatabaseError> {
        let sql = format!(
            "INSERT INTO feeding_events (event_id, amount, feed_type, spitup, start_time, end_time) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            FEEDING_COLUMNS
        );
        let row = sqlx::query_as::<_, FeedingRow>(&sql)
            .bind(event_id.value())
            .bind(feeding.amount)
            .bind(feeding.feed_type)
            .bind(feeding.spitup)
            .bind(feeding.start_time)
            .bind(feeding.end_time)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row)
    }

    /// Fetches a base event by id
    pub async fn find_event(
        &self,
        conn: &mut PgConnection,
        id: EventId,
    ) -> Result<Option<EventRow>, DatabaseError> {
        let sql = format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS);
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id.value())
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    /// Fetches a base event and holds a row lock until the transaction ends
    pub async fn lock_event(
        &self,
        conn: &mut PgConnection,
        id: EventId,
    ) -> Result<Option<EventRow>, DatabaseError> {
        let sql = format!("SELECT {} FROM events WHERE id = $1 FOR UPDATE", EVENT_COLUMNS);
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id.value())
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    /// Fetches a base event joined with its feeding, if any
    pub async fn find_with_extension(
        &self,
        conn: &mut PgConnection,
        id: EventId,
    ) -> Result<Option<EventWithExtensionRow>, DatabaseError> {
        let sql = format!("{} WHERE e.id = $1", JOINED_SELECT);
        let row = sqlx::query_as::<_, EventWithExtensionRow>(&sql)
            .bind(id.value())
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    /// Lists joined events matching the filter, newest first
    pub async fn list_with_extension(
        &self,
        conn: &mut PgConnection,
        filter: &EventFilter,
    ) -> Result<Vec<EventWithExtensionRow>, DatabaseError> {
        let sql = format!(
            r#"{}
            WHERE ($1::event_type IS NULL OR e.event_type = $1)
              AND ($2::timestamptz IS NULL OR e.time >= $2)
              AND ($3::timestamptz IS NULL OR e.time < $3)
            ORDER BY e.time DESC, e.id DESC
            LIMIT $4 OFFSET $5"#,
            JOINED_SELECT
        );
        let rows = sqlx::query_as::<_, EventWithExtensionRow>(&sql)
            .bind(filter.event_type)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    /// Overwrites notes and mood, returning the new row
    pub async fn update_event(
        &self,
        conn: &mut PgConnection,
        id: EventId,
        notes: Option<&str>,
        mood: Option<MoodType>,
    ) -> Result<Option<EventRow>, DatabaseError> {
        let sql = format!(
            "UPDATE events SET notes = $2, mood = $3, updated_at = now() WHERE id = $1 RETURNING {}",
            EVENT_COLUMNS
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id.value())
            .bind(notes)
            .bind(mood)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    /// Deletes the feeding for `event_id`; returns the number of rows removed
    pub async fn delete_feeding(
        &self,
        conn: &mut PgConnection,
        event_id: EventId,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM feeding_events WHERE event_id = $1")
            .bind(event_id.value())
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Deletes a base event; returns the number of rows removed
    pub async fn delete_event(
        &self,
        conn: &mut PgConnection,
        id: EventId,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id.value())
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}

// ============================================================================
// Type definitions
// ============================================================================

/// Event type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "event_type", rename_all = "snake_case")]
pub enum EventType {
    Feeding,
    Diaper,
    Sleep,
    Generic,
}

/// Mood enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "mood_type", rename_all = "snake_case")]
pub enum MoodType {
    Happy,
    Fussy,
    Calm,
    Crying,
}

/// Feed type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "feed_type", rename_all = "snake_case")]
pub enum FeedType {
    Bottle,
    Breast,
    Solid,
}

impl From<domain::EventType> for EventType {
    fn from(value: domain::EventType) -> Self {
        match value {
            domain::EventType::Feeding => EventType::Feeding,
            domain::EventType::Diaper => EventType::Diaper,
            domain::EventType::Sleep => EventType::Sleep,
            domain::EventType::Generic => EventType::Generic,
        }
    }
}

impl From<EventType> for domain::EventType {
    fn from(value: EventType) -> Self {
        match value {
            EventType::Feeding => domain::EventType::Feeding,
            EventType::Diaper => domain::EventType::Diaper,
            EventType::Sleep => domain::EventType::Sleep,
            EventType::Generic => domain::EventType::Generic,
        }
    }
}

impl From<domain::Mood> for MoodType {
    fn from(value: domain::Mood) -> Self {
        match value {
            domain::Mood::Happy => MoodType::Happy,
            domain::Mood::Fussy => MoodType::Fussy,
            domain::Mood::Calm => MoodType::Calm,
            domain::Mood::Crying => MoodType::Crying,
        }
    }
}

impl From<MoodType> for domain::Mood {
    fn from(value: MoodType) -> Self {
        match value {
            MoodType::Happy => domain::Mood::Happy,
            MoodType::Fussy => domain::Mood::Fussy,
            MoodType::Calm => domain::Mood::Calm,
            MoodType::Crying => domain::Mood::Crying,
        }
    }
}

impl From<domain::FeedType> for FeedType {
    fn from(value: domain::FeedType) -> Self {
        match value {
            domain::FeedType::Bottle => FeedType::Bottle,
            domain::FeedType::Breast => FeedType::Breast,
            domain::FeedType::Solid => FeedType::Solid,
        }
    }
}

impl From<FeedType> for domain::FeedType {
    fn from(value: FeedType) -> Self {
        match value {
            FeedType::Bottle => domain::FeedType::Bottle,
            FeedType::Breast => domain::FeedType::Breast,
            FeedType::Solid => domain::FeedType::Solid,
        }
    }
}

// ============================================================================
// Row types
// ============================================================================

/// Database row for a base event
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub id: i64,
    pub event_type: EventType,
    pub time: DateTime<Utc>,
    pub notes: Option<String>,
    pub mood: Option<MoodType>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRow {
    pub fn into_event(self) -> domain::Event {
        domain::Event {
            id: EventId::new(self.id),
            event_type: self.event_type.into(),
            time: self.time,
            notes: self.notes,
            mood: self.mood.map(Into::into),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Database row for a feeding extension
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedingRow {
    pub event_id: i64,
    pub amount: Decimal,
    pub feed_type: FeedType,
    pub spitup: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl FeedingRow {
    pub fn into_feeding(self) -> domain::Feeding {
        domain::Feeding {
            event_id: EventId::new(self.event_id),
            amount: self.amount,
            feed_type: self.feed_type.into(),
            spitup: self.spitup,
            start_time: self.start_time,
            end_time: self.end_time,
            created_at: self.created_at,
        }
    }
}

/// Base event LEFT JOINed with its feeding columns
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventWithExtensionRow {
    pub id: i64,
    pub event_type: EventType,
    pub time: DateTime<Utc>,
    pub notes: Option<String>,
    pub mood: Option<MoodType>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub feeding_event_id: Option<i64>,
    pub feeding_amount: Option<Decimal>,
    pub feeding_feed_type: Option<FeedType>,
    pub feeding_spitup: Option<bool>,
    pub feeding_start_time: Option<DateTime<Utc>>,
    pub feeding_end_time: Option<DateTime<Utc>>,
    pub feeding_created_at: Option<DateTime<Utc>>,
}

impl EventWithExtensionRow {
    /// Splits the joined row into its base and extension parts
    pub fn into_parts(self) -> Result<(EventRow, Option<FeedingRow>), DatabaseError> {
        let feeding = match self.feeding_event_id {
            None => None,
            Some(event_id) => Some(FeedingRow {
                event_id,
                amount: self.feeding_amount.ok_or_else(|| missing_column("amount"))?,
                feed_type: self.feeding_feed_type.ok_or_else(|| missing_column("feed_type"))?,
                spitup: self.feeding_spitup.ok_or_else(|| missing_column("spitup"))?,
                start_time: self.feeding_start_time.ok_or_else(|| missing_column("start_time"))?,
                end_time: self.feeding_end_time.ok_or_else(|| missing_column("end_time"))?,
                created_at: self.feeding_created_at.ok_or_else(|| missing_column("created_at"))?,
            }),
        };
        let event = EventRow {
            id: self.id,
            event_type: self.event_type,
            time: self.time,
            notes: self.notes,
            mood: self.mood,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        Ok((event, feeding))
    }

    /// Converts the joined row into a composite event
    pub fn into_composite(self) -> Result<domain::CompositeEvent, DatabaseError> {
        let (event, feeding) = self.into_parts()?;
        Ok(compose(event, feeding))
    }
}

fn missing_column(column: &str) -> DatabaseError {
    DatabaseError::DecodeFailed(format!("feeding row present but '{}' is NULL", column))
}

/// Joins a base row with its optional feeding row
pub fn compose(event: EventRow, feeding: Option<FeedingRow>) -> domain::CompositeEvent {
    domain::CompositeEvent {
        event: event.into_event(),
        extension: feeding.map(|f| domain::EventExtension::Feeding(f.into_feeding())),
    }
}

/// New base event to insert
#[derive(Debug, Clone)]
pub struct NewEventRow {
    pub event_type: EventType,
    pub time: DateTime<Utc>,
    pub notes: Option<String>,
    pub mood: Option<MoodType>,
}

impl From<&domain::NewEvent> for NewEventRow {
    fn from(event: &domain::NewEvent) -> Self {
        Self {
            event_type: event.event_type.into(),
            time: to_stored_precision(event.time),
            notes: event.notes.clone(),
            mood: event.mood.map(Into::into),
        }
    }
}

/// New feeding extension to insert
#[derive(Debug, Clone)]
pub struct NewFeedingRow {
    pub amount: Decimal,
    pub feed_type: FeedType,
    pub spitup: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<&domain::NewFeeding> for NewFeedingRow {
    fn from(feeding: &domain::NewFeeding) -> Self {
        Self {
            amount: feeding.amount,
            feed_type: feeding.feed_type.into(),
            spitup: feeding.spitup,
            start_time: to_stored_precision(feeding.start_time),
            end_time: to_stored_precision(feeding.end_time),
        }
    }
}

/// Filter for listing events
#[derive(Debug, Clone, PartialEq)]
pub struct EventFilter {
    pub event_type: Option<EventType>,
    /// Inclusive lower bound on event time
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on event time
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl From<&domain::EventQuery> for EventFilter {
    fn from(query: &domain::EventQuery) -> Self {
        Self {
            event_type: query.event_type.map(Into::into),
            from: query.window.from,
            to: query.window.to,
            limit: i64::from(query.effective_limit()),
            offset: i64::from(query.effective_offset()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn joined(feeding: bool) -> EventWithExtensionRow {
        let t = Utc.with_ymd_and_hms(2024, 8, 1, 22, 0, 0).unwrap();
        EventWithExtensionRow {
            id: 9,
            event_type: EventType::Feeding,
            time: t,
            notes: Some(String::new()),
            mood: Some(MoodType::Crying),
            created_at: t,
            updated_at: t,
            feeding_event_id: feeding.then_some(9),
            feeding_amount: feeding.then_some(dec!(95.5)),
            feeding_feed_type: feeding.then_some(FeedType::Breast),
            feeding_spitup: feeding.then_some(true),
            feeding_start_time: feeding.then_some(t),
            feeding_end_time: feeding.then_some(t),
            feeding_created_at: feeding.then_some(t),
        }
    }

    #[test]
    fn test_joined_row_with_feeding() {
        let composite = joined(true).into_composite().unwrap();

        assert_eq!(composite.id(), EventId::new(9));
        assert_eq!(composite.event.notes.as_deref(), Some(""));
        assert_eq!(composite.event.mood, Some(domain::Mood::Crying));
        let feeding = composite.feeding().unwrap();
        assert_eq!(feeding.amount, dec!(95.5));
        assert_eq!(feeding.feed_type, domain::FeedType::Breast);
        assert!(composite.check_consistency().is_ok());
    }

    #[test]
    fn test_joined_row_without_feeding() {
        let composite = joined(false).into_composite().unwrap();
        assert!(composite.extension.is_none());
    }

    #[test]
    fn test_partial_feeding_columns_fail_to_decode() {
        let mut row = joined(true);
        row.feeding_amount = None;
        assert!(matches!(row.into_parts(), Err(DatabaseError::DecodeFailed(_))));
    }

    #[test]
    fn test_filter_from_query_applies_defaults() {
        let query = domain::EventQuery::by_type(domain::EventType::Sleep);
        let filter = EventFilter::from(&query);

        assert_eq!(filter.event_type, Some(EventType::Sleep));
        assert_eq!(filter.limit, 50);
        assert_eq!(filter.offset, 0);
    }

    #[test]
    fn test_enum_conversions_cover_all_variants() {
        for event_type in domain::EventType::ALL {
            assert_eq!(domain::EventType::from(EventType::from(event_type)), event_type);
        }
        for mood in domain::Mood::ALL {
            assert_eq!(domain::Mood::from(MoodType::from(mood)), mood);
        }
        for feed_type in domain::FeedType::ALL {
            assert_eq!(domain::FeedType::from(FeedType::from(feed_type)), feed_type);
        }
    }
}
