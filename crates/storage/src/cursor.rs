//! Pagination cursors over the `(created_at, id)` ordering.

use crate::{ActivityId, ActivityRecord};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Position in a history listing, just past the last record returned.
///
/// The string form is opaque to clients; round-trip it through
/// [`Display`](fmt::Display) and [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor {
    pub created_at: DateTime<Utc>,
    pub id: ActivityId,
}

impl Cursor {
    /// Cursor selecting everything strictly older than `record`.
    pub fn after(record: &ActivityRecord) -> Self {
        Self {
            created_at: record.created_at,
            id: record.id,
        }
    }

    /// Whether `record` sorts strictly before this position.
    pub fn admits(&self, record: &ActivityRecord) -> bool {
        record.sort_key() < (self.created_at, self.id)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.created_at.timestamp_micros(), self.id.0.simple())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed cursor '{0}'")]
pub struct InvalidCursor(pub String);

impl FromStr for Cursor {
    type Err = InvalidCursor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidCursor(s.to_string());
        let (micros, id) = s.split_once('_').ok_or_else(invalid)?;
        let micros: i64 = micros.parse().map_err(|_| invalid())?;
        let created_at = DateTime::from_timestamp_micros(micros).ok_or_else(invalid)?;
        let id = id.parse().map_err(|_| invalid())?;
        Ok(Self { created_at, id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_string_round_trips() {
        let cursor = Cursor {
            created_at: DateTime::from_timestamp_micros(1_700_000_000_123_456).unwrap(),
            id: ActivityId::new(),
        };
        let parsed: Cursor = cursor.to_string().parse().unwrap();
        assert_eq!(parsed, cursor);
    }

    #[test]
    fn garbage_cursor_is_rejected() {
        for token in ["", "abc", "12_not-a-uuid", "x_0190f0e2c3b47c1a8f3e2d1c0b0a0908"] {
            assert_eq!(
                token.parse::<Cursor>(),
                Err(InvalidCursor(token.to_string()))
            );
        }
    }
}
