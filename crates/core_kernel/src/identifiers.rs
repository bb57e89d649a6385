//! Strongly-typed identifiers for stored records
//!
//! Identifiers are assigned by the store (a `BIGSERIAL` column) and wrapped
//! in newtypes so an event id can never be confused with a raw count or
//! offset.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a store-assigned value
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer
            pub const fn value(&self) -> i64 {
                self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }

            /// True when the value could have been produced by a serial column
            pub fn is_assigned(&self) -> bool {
                self.0 > 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(raw.parse()?))
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }
    };
}

define_id!(EventId, "EVT");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_display() {
        assert_eq!(EventId::new(42).to_string(), "EVT-42");
    }

    #[test]
    fn test_id_parsing() {
        let original = EventId::new(7);
        let parsed: EventId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);

        let bare: EventId = "7".parse().unwrap();
        assert_eq!(bare, original);
    }

    #[test]
    fn test_assigned() {
        assert!(EventId::new(1).is_assigned());
        assert!(!EventId::new(0).is_assigned());
    }
}
