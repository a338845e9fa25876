//! Concurrent identifier to payload map.

use crate::error::{Result, StoreError};
use crate::types::{Record, RecordId};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Mapping from record identifier to raw payload.
///
/// Reads share the lock, every mutation takes it exclusively.
pub struct RecordMap {
    entries: RwLock<HashMap<RecordId, Vec<u8>>>,
}

impl RecordMap {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a record under a freshly generated identifier.
    ///
    /// Fails with `Internal` if the identifier is already taken; an existing
    /// payload is never overwritten.
    pub fn insert_new(&self, id: RecordId, raw: Vec<u8>) -> Result<()> {
        if id.is_nil() {
            return Err(StoreError::Internal("generated nil record id".into()));
        }

        let mut entries = self.entries.write();
        if entries.contains_key(&id) {
            return Err(StoreError::Internal(format!("record id collision: {}", id)));
        }
        entries.insert(id, raw);
        Ok(())
    }

    /// Get a copy of the payload stored under `id`.
    pub fn get(&self, id: &RecordId) -> Result<Vec<u8>> {
        self.entries
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(id))
    }

    /// Replace the payload of an existing record.
    pub fn replace(&self, id: &RecordId, raw: Vec<u8>) -> Result<()> {
        let mut entries = self.entries.write();
        match entries.get_mut(id) {
            Some(slot) => {
                *slot = raw;
                Ok(())
            }
            None => Err(StoreError::not_found(id)),
        }
    }

    /// Remove a record. Returns whether anything was removed.
    pub fn remove(&self, id: &RecordId) -> bool {
        self.entries.write().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of every stored record.
    pub fn snapshot(&self) -> Vec<Record> {
        self.entries
            .read()
            .iter()
            .map(|(id, raw)| Record {
                id: *id,
                raw: raw.clone(),
            })
            .collect()
    }
}

impl Default for RecordMap {
    fn default() -> Self {
        Self::new()
    }
}
