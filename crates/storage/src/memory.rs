//! In-memory stores for tests and embedding.

use crate::{
    ActivityFilter, ActivityRecord, ActivityStore, Cursor, Error, EstateAccess, EstateId,
    EstateStore, Result,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

fn poisoned() -> Error {
    Error::Unavailable("in-memory store lock poisoned".to_string())
}

/// Estate projections held in a map.
#[derive(Debug, Default)]
pub struct MemoryEstateStore {
    estates: RwLock<HashMap<EstateId, EstateAccess>>,
}

impl MemoryEstateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the projection of an estate.
    pub fn put(&self, estate_id: impl Into<EstateId>, access: EstateAccess) -> Result<()> {
        self.estates
            .write()
            .map_err(|_| poisoned())?
            .insert(estate_id.into(), access);
        Ok(())
    }
}

impl EstateStore for MemoryEstateStore {
    fn fetch_access_projection(&self, estate_id: &EstateId) -> Result<Option<EstateAccess>> {
        Ok(self
            .estates
            .read()
            .map_err(|_| poisoned())?
            .get(estate_id)
            .cloned())
    }
}

/// Activity records held in a vector, in insertion order.
///
/// [`set_unavailable`](Self::set_unavailable) makes every call fail, which is
/// how callers exercise their outage handling.
#[derive(Debug, Default)]
pub struct MemoryActivityStore {
    records: RwLock<Vec<ActivityRecord>>,
    unavailable: AtomicBool,
}

impl MemoryActivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Everything appended so far, in insertion order.
    pub fn records(&self) -> Result<Vec<ActivityRecord>> {
        Ok(self.records.read().map_err(|_| poisoned())?.clone())
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Unavailable("activity store is offline".to_string()));
        }
        Ok(())
    }
}

impl ActivityStore for MemoryActivityStore {
    fn insert(&self, record: &ActivityRecord) -> Result<()> {
        self.check_available()?;
        self.records
            .write()
            .map_err(|_| poisoned())?
            .push(record.clone());
        Ok(())
    }

    fn query(
        &self,
        estate_id: &EstateId,
        filter: &ActivityFilter,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<Vec<ActivityRecord>> {
        self.check_available()?;
        let records = self.records.read().map_err(|_| poisoned())?;
        let mut matching: Vec<ActivityRecord> = records
            .iter()
            .filter(|r| &r.estate_id == estate_id)
            .filter(|r| filter.matches(r))
            .filter(|r| cursor.is_none_or(|c| c.admits(r)))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        matching.truncate(limit);
        Ok(matching)
    }
}
