//! In-memory ban store.

use ahash::AHashMap;
use parking_lot::Mutex;

use super::BanStore;
use crate::error::StoreError;
use crate::record::{BanId, BanRecord};

/// Keeps records in a map. Used by default and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<AHashMap<BanId, BanRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BanStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<BanRecord>, StoreError> {
        let mut records: Vec<BanRecord> = self.records.lock().values().cloned().collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    fn insert(&self, record: &BanRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock();
        if records.contains_key(&record.id) {
            return Err(StoreError::Conflict(format!("ban {} already stored", record.id)));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    fn update(&self, record: &BanRecord) -> Result<(), StoreError> {
        match self.records.lock().get_mut(&record.id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(StoreError::Unavailable(format!("ban {} not stored", record.id))),
        }
    }
}
