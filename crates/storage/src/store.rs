//! Store interfaces and the SQLite implementation.

use crate::{
    ActivityFilter, ActivityId, ActivityKind, ActivityRecord, Collaborator, Cursor, Error,
    EstateAccess, EstateId, Result, UserId,
};
use chrono::DateTime;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde::Deserialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Read access to the fields of an estate that decide who may touch it.
pub trait EstateStore: Send + Sync {
    /// Fetch owner and collaborators of an estate, or `None` if it does not exist.
    fn fetch_access_projection(&self, estate_id: &EstateId) -> Result<Option<EstateAccess>>;
}

/// Append-only persistence for activity records.
///
/// There is deliberately no update or delete here.
pub trait ActivityStore: Send + Sync {
    /// Append one record.
    fn insert(&self, record: &ActivityRecord) -> Result<()>;

    /// Records of one estate matching `filter`, strictly below `cursor`,
    /// ordered by `(created_at, id)` descending, at most `limit` of them.
    fn query(
        &self,
        estate_id: &EstateId,
        filter: &ActivityFilter,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<Vec<ActivityRecord>>;
}

/// SQLite-backed store for estates and their activity.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS estates (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS estate_collaborators (
                estate_id TEXT NOT NULL REFERENCES estates(id),
                position INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                PRIMARY KEY (estate_id, position)
            );

            CREATE TABLE IF NOT EXISTS activity (
                id TEXT PRIMARY KEY,
                estate_id TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                action TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                message TEXT NOT NULL,
                snapshot TEXT,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_activity_estate
                ON activity(estate_id, created_at DESC, id DESC);
            CREATE INDEX IF NOT EXISTS idx_activity_estate_kind_action
                ON activity(estate_id, kind, action, created_at DESC, id DESC);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Unavailable("connection lock poisoned".to_string()))
    }

    /// Register a new estate with its owner.
    pub fn create_estate(&self, estate_id: &EstateId, owner_id: &UserId) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO estates (id, owner_id) VALUES (?1, ?2)",
            params![estate_id.as_str(), owner_id.as_str()],
        )?;
        Ok(())
    }

    /// Grant `user_id` a role on an estate.
    ///
    /// Any earlier row for the same user is dropped first, so the stored
    /// sequence never carries duplicate user ids. The new grant goes last.
    pub fn put_collaborator(
        &self,
        estate_id: &EstateId,
        user_id: &UserId,
        role: &str,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        ensure_estate(&tx, estate_id)?;
        tx.execute(
            "DELETE FROM estate_collaborators WHERE estate_id = ?1 AND user_id = ?2",
            params![estate_id.as_str(), user_id.as_str()],
        )?;
        tx.execute(
            "INSERT INTO estate_collaborators (estate_id, position, user_id, role)
             SELECT ?1, COALESCE(MAX(position) + 1, 0), ?2, ?3
             FROM estate_collaborators WHERE estate_id = ?1",
            params![estate_id.as_str(), user_id.as_str(), role],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Revoke every grant `user_id` holds on an estate. Returns whether any existed.
    pub fn remove_collaborator(&self, estate_id: &EstateId, user_id: &UserId) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        ensure_estate(&tx, estate_id)?;
        let removed = tx.execute(
            "DELETE FROM estate_collaborators WHERE estate_id = ?1 AND user_id = ?2",
            params![estate_id.as_str(), user_id.as_str()],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }
}

fn ensure_estate(conn: &Connection, estate_id: &EstateId) -> Result<()> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM estates WHERE id = ?1",
            [estate_id.as_str()],
            |_| Ok(()),
        )
        .optional()?;
    exists.ok_or_else(|| Error::NotFound(format!("estate {estate_id}")))
}

impl EstateStore for SqliteStore {
    fn fetch_access_projection(&self, estate_id: &EstateId) -> Result<Option<EstateAccess>> {
        let conn = self.conn()?;
        // Owner and collaborators come from one snapshot.
        let tx = conn.unchecked_transaction()?;
        let owner: Option<String> = tx
            .query_row(
                "SELECT owner_id FROM estates WHERE id = ?1",
                [estate_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(owner) = owner else {
            return Ok(None);
        };

        let collaborators = {
            let mut stmt = tx.prepare(
                "SELECT user_id, role FROM estate_collaborators
                 WHERE estate_id = ?1 ORDER BY position",
            )?;
            let rows = stmt
                .query_map([estate_id.as_str()], |row| {
                    Ok(Collaborator {
                        user_id: UserId::new(row.get::<_, String>(0)?),
                        role: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        tx.commit()?;

        Ok(Some(EstateAccess {
            owner_id: UserId::new(owner),
            collaborators,
        }))
    }
}

impl ActivityStore for SqliteStore {
    fn insert(&self, record: &ActivityRecord) -> Result<()> {
        let snapshot = record
            .snapshot
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn()?.execute(
            "INSERT INTO activity
                (id, estate_id, owner_id, kind, action, entity_id, message, snapshot, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id.to_string(),
                record.estate_id.as_str(),
                record.owner_id.as_str(),
                record.kind.as_str(),
                record.action,
                record.entity_id,
                record.message,
                snapshot,
                record.created_at.timestamp_micros(),
            ],
        )?;
        Ok(())
    }

    fn query(
        &self,
        estate_id: &EstateId,
        filter: &ActivityFilter,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<Vec<ActivityRecord>> {
        let mut sql = String::from(
            "SELECT id, estate_id, owner_id, kind, action, entity_id, message, snapshot, created_at
             FROM activity WHERE estate_id = ?",
        );
        let mut args = vec![Value::Text(estate_id.to_string())];

        if let Some(kind) = filter.kind {
            sql.push_str(" AND kind = ?");
            args.push(Value::Text(kind.as_str().to_string()));
        }
        if let Some(action) = &filter.action {
            sql.push_str(" AND action = ?");
            args.push(Value::Text(action.clone()));
        }
        if let Some(cursor) = cursor {
            sql.push_str(" AND (created_at, id) < (?, ?)");
            args.push(Value::Integer(cursor.created_at.timestamp_micros()));
            args.push(Value::Text(cursor.id.to_string()));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?");
        args.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

        debug!(estate_id = %estate_id, ?filter, limit, "querying activity");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = serde_rusqlite::from_rows::<ActivityRow>(stmt.query(params_from_iter(args))?);
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }
}

#[derive(Deserialize)]
struct ActivityRow {
    id: String,
    estate_id: String,
    owner_id: String,
    kind: String,
    action: String,
    entity_id: String,
    message: String,
    snapshot: Option<String>,
    created_at: i64,
}

impl ActivityRow {
    fn into_record(self) -> Result<ActivityRecord> {
        let id: ActivityId = self
            .id
            .parse()
            .map_err(|_| Error::Corrupt(format!("activity id '{}'", self.id)))?;
        let kind: ActivityKind = self
            .kind
            .parse()
            .map_err(|e| Error::Corrupt(format!("activity {id}: {e}")))?;
        let created_at = DateTime::from_timestamp_micros(self.created_at).ok_or_else(|| {
            Error::Corrupt(format!("activity {id}: timestamp {}", self.created_at))
        })?;
        let snapshot = self
            .snapshot
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(ActivityRecord {
            id,
            estate_id: EstateId::new(self.estate_id),
            owner_id: UserId::new(self.owner_id),
            kind,
            action: self.action,
            entity_id: self.entity_id,
            message: self.message,
            snapshot,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn record(
        estate: &str,
        kind: ActivityKind,
        action: &str,
        created_at: DateTime<Utc>,
    ) -> ActivityRecord {
        ActivityRecord {
            id: ActivityId::new(),
            estate_id: estate.into(),
            owner_id: "u1".into(),
            kind,
            action: action.to_string(),
            entity_id: format!("{kind}-1"),
            message: format!("{kind} {action}"),
            snapshot: None,
            created_at,
        }
    }

    fn base_time() -> DateTime<Utc> {
        DateTime::from_timestamp_micros(1_760_000_000_000_000).unwrap()
    }

    #[test]
    fn test_projection_keeps_collaborator_order() {
        let store = SqliteStore::in_memory().unwrap();
        let estate = EstateId::from("e1");
        store.create_estate(&estate, &"u1".into()).unwrap();
        store.put_collaborator(&estate, &"u2".into(), "EDITOR").unwrap();
        store.put_collaborator(&estate, &"u3".into(), "VIEWER").unwrap();

        let projection = store.fetch_access_projection(&estate).unwrap().unwrap();
        assert_eq!(projection.owner_id, UserId::from("u1"));
        assert_eq!(
            projection.collaborators,
            vec![Collaborator::new("u2", "EDITOR"), Collaborator::new("u3", "VIEWER")]
        );
    }

    #[test]
    fn test_put_collaborator_replaces_existing_grant() {
        let store = SqliteStore::in_memory().unwrap();
        let estate = EstateId::from("e1");
        store.create_estate(&estate, &"u1".into()).unwrap();
        store.put_collaborator(&estate, &"u2".into(), "VIEWER").unwrap();
        store.put_collaborator(&estate, &"u3".into(), "VIEWER").unwrap();
        store.put_collaborator(&estate, &"u2".into(), "EDITOR").unwrap();

        let projection = store.fetch_access_projection(&estate).unwrap().unwrap();
        assert_eq!(
            projection.collaborators,
            vec![Collaborator::new("u3", "VIEWER"), Collaborator::new("u2", "EDITOR")]
        );

        assert!(store.remove_collaborator(&estate, &"u2".into()).unwrap());
        assert!(!store.remove_collaborator(&estate, &"u2".into()).unwrap());
    }

    #[test]
    fn test_projection_reads_leave_no_open_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("estates.db");
        let reader = SqliteStore::open(&path).unwrap();
        let writer = SqliteStore::open(&path).unwrap();
        let estate = EstateId::from("e1");
        writer.create_estate(&estate, &"u1".into()).unwrap();

        assert!(reader.fetch_access_projection(&"missing".into()).unwrap().is_none());
        let projection = reader.fetch_access_projection(&estate).unwrap().unwrap();
        assert!(projection.collaborators.is_empty());
        assert!(reader.conn().unwrap().is_autocommit());

        writer.put_collaborator(&estate, &"u2".into(), "EDITOR").unwrap();
        let projection = reader.fetch_access_projection(&estate).unwrap().unwrap();
        assert_eq!(projection.collaborators, vec![Collaborator::new("u2", "EDITOR")]);
    }

    #[test]
    fn test_missing_estate() {
        let store = SqliteStore::in_memory().unwrap();
        let estate = EstateId::from("nope");
        assert!(store.fetch_access_projection(&estate).unwrap().is_none());
        assert!(matches!(
            store.put_collaborator(&estate, &"u2".into(), "EDITOR"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_insert_and_query_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        let mut rec = record("e1", ActivityKind::Invoice, "created", base_time());
        rec.snapshot = Some(json!({ "before": null, "after": { "amount": 120 } }));
        store.insert(&rec).unwrap();

        let found = store
            .query(&"e1".into(), &ActivityFilter::default(), None, 10)
            .unwrap();
        assert_eq!(found, vec![rec]);
    }

    #[test]
    fn test_query_orders_by_time_then_id_and_respects_cursor() {
        let store = SqliteStore::in_memory().unwrap();
        let t = base_time();
        let a = record("e1", ActivityKind::Note, "created", t);
        let b = record("e1", ActivityKind::Invoice, "created", t);
        let c = record("e1", ActivityKind::Note, "updated", t + Duration::seconds(1));
        let other = record("e2", ActivityKind::Note, "created", t + Duration::seconds(5));
        for rec in [&a, &b, &c, &other] {
            store.insert(rec).unwrap();
        }

        let all = store
            .query(&"e1".into(), &ActivityFilter::default(), None, 10)
            .unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);

        let cursor = Cursor::after(&all[1]);
        let rest = store
            .query(&"e1".into(), &ActivityFilter::default(), Some(&cursor), 10)
            .unwrap();
        assert_eq!(rest.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a.id]);
    }

    #[test]
    fn test_filter_applies_before_limit() {
        let store = SqliteStore::in_memory().unwrap();
        let t = base_time();
        for i in 0..6 {
            let kind = if i % 2 == 0 { ActivityKind::Invoice } else { ActivityKind::Task };
            store
                .insert(&record("e1", kind, "created", t + Duration::seconds(i)))
                .unwrap();
        }

        let invoices = store
            .query(&"e1".into(), &ActivityFilter::kind(ActivityKind::Invoice), None, 3)
            .unwrap();
        assert_eq!(invoices.len(), 3);
        assert!(invoices.iter().all(|r| r.kind == ActivityKind::Invoice));

        let none = store
            .query(
                &"e1".into(),
                &ActivityFilter::kind(ActivityKind::Invoice).with_action("deleted"),
                None,
                3,
            )
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("estates.db");
        let rec = record("e1", ActivityKind::Document, "uploaded", base_time());

        {
            let store = SqliteStore::open(&path).unwrap();
            store.create_estate(&"e1".into(), &"u1".into()).unwrap();
            store.insert(&rec).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert!(store.fetch_access_projection(&"e1".into()).unwrap().is_some());
        let found = store
            .query(&"e1".into(), &ActivityFilter::default(), None, 1)
            .unwrap();
        assert_eq!(found, vec![rec]);
    }
}
