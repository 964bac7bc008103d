//! JSON snapshot file store.

use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};

use super::BanStore;
use crate::error::{Result, StoreError};
use crate::record::BanRecord;

/// Stores all records as a single JSON array.
///
/// Every write rewrites the snapshot to a temporary file next to the
/// target and renames it into place, so readers never see a torn file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<Vec<BanRecord>>,
}

impl JsonFileStore {
    /// Open a snapshot file, starting empty if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };
        log::debug!("Opened ban store {:?} ({} records)", path, records.len());
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_snapshot(&self, records: &[BanRecord]) -> std::result::Result<(), StoreError> {
        let content = serde_json::to_string_pretty(records)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let temp_path = self.temp_path();
        fs::write(&temp_path, content).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        // Atomic rename
        fs::rename(&temp_path, &self.path).map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

impl BanStore for JsonFileStore {
    fn load_all(&self) -> std::result::Result<Vec<BanRecord>, StoreError> {
        Ok(self.records.lock().clone())
    }

    fn insert(&self, record: &BanRecord) -> std::result::Result<(), StoreError> {
        let mut records = self.records.lock();
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Conflict(format!("ban {} already stored", record.id)));
        }
        records.push(record.clone());
        if let Err(e) = self.write_snapshot(&records) {
            records.pop();
            return Err(e);
        }
        Ok(())
    }

    fn update(&self, record: &BanRecord) -> std::result::Result<(), StoreError> {
        let mut records = self.records.lock();
        let Some(pos) = records.iter().position(|r| r.id == record.id) else {
            return Err(StoreError::Unavailable(format!("ban {} not stored", record.id)));
        };
        let previous = std::mem::replace(&mut records[pos], record.clone());
        if let Err(e) = self.write_snapshot(&records) {
            records[pos] = previous;
            return Err(e);
        }
        Ok(())
    }
}
