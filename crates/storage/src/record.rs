//! Activity record types for the estate history log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Opaque identifier of an estate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EstateId(String);

impl EstateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EstateId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EstateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for EstateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identity of a user, as handed over by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A unique identifier for an activity record.
///
/// Backed by a UUIDv7, so ids minted later in the same process compare
/// greater. The ordering is what breaks `created_at` ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActivityId(pub Uuid);

impl ActivityId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ActivityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ActivityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// The sub-resource family an activity record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Invoice,
    Document,
    Task,
    Note,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 4] = [
        ActivityKind::Invoice,
        ActivityKind::Document,
        ActivityKind::Task,
        ActivityKind::Note,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Invoice => "invoice",
            ActivityKind::Document => "document",
            ActivityKind::Task => "task",
            ActivityKind::Note => "note",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl From<ActivityKind> for String {
    fn from(kind: ActivityKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Returned when a string names no known [`ActivityKind`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown activity kind '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for ActivityKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// One immutable entry in an estate's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: ActivityId,
    pub estate_id: EstateId,
    /// Owner of the estate when the record was written.
    pub owner_id: UserId,
    pub kind: ActivityKind,
    pub action: String,
    pub entity_id: String,
    pub message: String,
    /// Before/after fields for display. Never interpreted here.
    pub snapshot: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl ActivityRecord {
    /// The `(created_at, id)` pair records are ordered by.
    pub fn sort_key(&self) -> (DateTime<Utc>, ActivityId) {
        (self.created_at, self.id)
    }
}

/// Narrowing predicate for history queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    pub kind: Option<ActivityKind>,
    pub action: Option<String>,
}

impl ActivityFilter {
    pub fn kind(kind: ActivityKind) -> Self {
        Self {
            kind: Some(kind),
            action: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn matches(&self, record: &ActivityRecord) -> bool {
        self.kind.is_none_or(|kind| kind == record.kind)
            && self
                .action
                .as_deref()
                .is_none_or(|action| action == record.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_only_lowercase_names() {
        assert_eq!("invoice".parse::<ActivityKind>(), Ok(ActivityKind::Invoice));
        assert_eq!("note".parse::<ActivityKind>(), Ok(ActivityKind::Note));
        assert_eq!(
            "Invoice".parse::<ActivityKind>(),
            Err(UnknownKind("Invoice".to_string()))
        );
        assert!("contact".parse::<ActivityKind>().is_err());
    }

    #[test]
    fn later_ids_sort_after_earlier_ones() {
        let first = ActivityId::new();
        let second = ActivityId::new();
        assert!(second > first);
        assert!(second.to_string() > first.to_string());
    }

    #[test]
    fn filter_matches_kind_and_action() {
        let record = ActivityRecord {
            id: ActivityId::new(),
            estate_id: "e1".into(),
            owner_id: "u1".into(),
            kind: ActivityKind::Invoice,
            action: "created".to_string(),
            entity_id: "inv-1".to_string(),
            message: "Invoice added".to_string(),
            snapshot: None,
            created_at: Utc::now(),
        };

        assert!(ActivityFilter::default().matches(&record));
        assert!(ActivityFilter::kind(ActivityKind::Invoice).matches(&record));
        assert!(!ActivityFilter::kind(ActivityKind::Task).matches(&record));
        assert!(
            ActivityFilter::kind(ActivityKind::Invoice)
                .with_action("created")
                .matches(&record)
        );
        assert!(
            !ActivityFilter::default()
                .with_action("status_changed")
                .matches(&record)
        );
    }
}
