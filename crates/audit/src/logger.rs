//! Appending entries to the activity log.

use crate::{Clock, Error, Result, SystemClock, ValidationError};
use chrono::SubsecRound;
use std::sync::Arc;
use storage::{ActivityId, ActivityKind, ActivityRecord, ActivityStore, EstateId, UserId};
use tracing::{debug, warn};

/// Input for one activity record, as a route handler builds it.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub estate_id: EstateId,
    pub owner_id: UserId,
    /// One of `invoice`, `document`, `task`, `note`.
    pub kind: String,
    pub action: String,
    pub entity_id: String,
    pub message: String,
    pub snapshot: Option<serde_json::Value>,
}

impl NewActivity {
    pub fn new(
        estate_id: impl Into<EstateId>,
        owner_id: impl Into<UserId>,
        kind: impl Into<String>,
        action: impl Into<String>,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            estate_id: estate_id.into(),
            owner_id: owner_id.into(),
            kind: kind.into(),
            action: action.into(),
            entity_id: entity_id.into(),
            message: message.into(),
            snapshot: None,
        }
    }

    pub fn with_snapshot(mut self, snapshot: serde_json::Value) -> Self {
        self.snapshot = Some(snapshot);
        self
    }
}

/// Writes immutable activity records.
///
/// The logger only appends. A failed append never undoes the change it was
/// describing; it comes back as a warning-class [`Error`].
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn ActivityStore>,
    clock: Arc<dyn Clock>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn ActivityStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate `entry`, stamp it and append it as exactly one record.
    pub fn append(&self, entry: NewActivity) -> Result<ActivityRecord> {
        let record = self.accept(entry)?;

        if let Err(err) = self.store.insert(&record) {
            warn!(
                estate_id = %record.estate_id,
                kind = %record.kind,
                action = %record.action,
                entity_id = %record.entity_id,
                error = %err,
                "activity append failed"
            );
            return Err(Error::append_failed(err));
        }

        debug!(
            id = %record.id,
            estate_id = %record.estate_id,
            kind = %record.kind,
            action = %record.action,
            "activity appended"
        );
        Ok(record)
    }

    fn accept(&self, entry: NewActivity) -> Result<ActivityRecord> {
        let kind: ActivityKind = entry.kind.parse().map_err(ValidationError::from)?;
        let action = required("action", &entry.action)?;
        let entity_id = required("entity_id", &entry.entity_id)?;
        let message = required("message", &entry.message)?;

        Ok(ActivityRecord {
            id: ActivityId::new(),
            estate_id: entry.estate_id,
            owner_id: entry.owner_id,
            kind,
            action,
            entity_id,
            message,
            snapshot: entry.snapshot,
            // Stores keep microseconds.
            created_at: self.clock.now().trunc_subsecs(6),
        })
    }
}

fn required(field: &'static str, value: &str) -> std::result::Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(trimmed.to_string())
}
