//! Paging through an estate's activity history.

use crate::{Error, Result, ValidationError};
use serde::Serialize;
use std::sync::Arc;
use storage::{ActivityFilter, ActivityRecord, ActivityStore, Cursor, EstateId};
use tracing::debug;

/// Upper bound on page size unless configured otherwise.
pub const DEFAULT_MAX_LIMIT: usize = 100;

/// One page of history, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityPage {
    pub records: Vec<ActivityRecord>,
    /// Present only when older matching records exist.
    #[serde(serialize_with = "serialize_cursor")]
    pub next_cursor: Option<Cursor>,
}

fn serialize_cursor<S: serde::Serializer>(
    cursor: &Option<Cursor>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match cursor {
        Some(cursor) => serializer.collect_str(cursor),
        None => serializer.serialize_none(),
    }
}

/// Read-only view over the activity log.
#[derive(Clone)]
pub struct ActivityQuery {
    store: Arc<dyn ActivityStore>,
    max_limit: usize,
}

impl ActivityQuery {
    pub fn new(store: Arc<dyn ActivityStore>) -> Self {
        Self {
            store,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }

    /// Cap every page at `max_limit` records (at least 1).
    pub fn with_max_limit(mut self, max_limit: usize) -> Self {
        self.max_limit = max_limit.max(1);
        self
    }

    /// List records of `estate_id` matching `filter`, newest first.
    ///
    /// With a cursor, only records strictly older than it are returned.
    /// A `limit` above the configured maximum is clamped to it, so a page may
    /// be shorter than requested while `next_cursor` is still set. Otherwise
    /// the page holds exactly `limit` records unless the history is
    /// exhausted, in which case there is no `next_cursor`.
    pub fn list(
        &self,
        estate_id: &EstateId,
        filter: &ActivityFilter,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<ActivityPage> {
        if limit == 0 {
            return Err(ValidationError::ZeroLimit.into());
        }
        let limit = limit.min(self.max_limit);

        // One extra row tells us whether another page exists.
        let mut records = self
            .store
            .query(estate_id, filter, cursor, limit.saturating_add(1))
            .map_err(Error::read_failed)?;

        let next_cursor = if records.len() > limit {
            records.truncate(limit);
            records.last().map(Cursor::after)
        } else {
            None
        };

        debug!(
            %estate_id,
            returned = records.len(),
            more = next_cursor.is_some(),
            "activity page"
        );
        Ok(ActivityPage {
            records,
            next_cursor,
        })
    }

    /// Same as [`list`](Self::list) with the cursor in its client-facing string form.
    pub fn list_from(
        &self,
        estate_id: &EstateId,
        filter: &ActivityFilter,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<ActivityPage> {
        let cursor = cursor
            .map(str::parse::<Cursor>)
            .transpose()
            .map_err(ValidationError::from)?;
        self.list(estate_id, filter, cursor.as_ref(), limit)
    }
}
