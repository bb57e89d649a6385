//! Unit tests for the temporal module
//!
//! Tests cover TimeSpan ordering and length limits and TimeWindow bounds.

use core_kernel::{TimeSpan, TimeWindow};
use core_kernel::temporal::TemporalError;
use chrono::{DateTime, Duration, TimeZone, Utc};

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, hour, minute, 0).unwrap()
}

mod time_span {
    use super::*;

    #[test]
    fn test_new_accepts_ordered_bounds() {
        let span = TimeSpan::new(at(8, 0), at(8, 15)).unwrap();

        assert_eq!(span.start(), at(8, 0));
        assert_eq!(span.end(), at(8, 15));
        assert_eq!(span.duration(), Duration::minutes(15));
    }

    #[test]
    fn test_new_accepts_equal_bounds() {
        let span = TimeSpan::new(at(8, 0), at(8, 0)).unwrap();
        assert_eq!(span, TimeSpan::instant(at(8, 0)));
        assert_eq!(span.duration(), Duration::zero());
    }

    #[test]
    fn test_new_rejects_start_after_end() {
        let result = TimeSpan::new(at(9, 0), at(8, 59));
        assert!(matches!(result, Err(TemporalError::InvalidSpan { .. })));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let span = TimeSpan::new(at(8, 0), at(8, 30)).unwrap();

        assert!(span.contains(at(8, 0)));
        assert!(span.contains(at(8, 30)));
        assert!(!span.contains(at(8, 31)));
    }

    #[test]
    fn test_ensure_at_most() {
        let span = TimeSpan::new(at(1, 0), at(3, 0)).unwrap();

        assert!(span.ensure_at_most(Duration::hours(2)).is_ok());
        assert!(matches!(
            span.ensure_at_most(Duration::minutes(90)),
            Err(TemporalError::SpanTooLong { actual_minutes: 120, max_minutes: 90 })
        ));
    }
}

mod time_window {
    use super::*;

    #[test]
    fn test_unbounded_contains_everything() {
        let window = TimeWindow::default();
        assert!(window.contains(at(0, 0)));
        assert!(window.contains(at(23, 59)));
    }

    #[test]
    fn test_open_ended_from() {
        let window = TimeWindow::new(Some(at(12, 0)), None).unwrap();
        assert!(!window.contains(at(11, 59)));
        assert!(window.contains(at(12, 0)));
    }

    #[test]
    fn test_rejects_reversed_window() {
        assert!(TimeWindow::new(Some(at(12, 0)), Some(at(11, 0))).is_err());
    }
}
