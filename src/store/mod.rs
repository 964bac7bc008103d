//! Persistence interface for ban records.
//!
//! The registry keeps the authoritative in-memory view and writes every
//! mutation through a [`BanStore`]. Store calls are the only blocking I/O
//! on the mutation path, so they run under a bounded timeout.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::StoreError;
use crate::record::BanRecord;

/// Backend that persists ban records.
pub trait BanStore: Send + Sync {
    /// Load every persisted record, deleted ones included.
    fn load_all(&self) -> Result<Vec<BanRecord>, StoreError>;

    /// Persist a new record.
    ///
    /// Returns [`StoreError::Conflict`] if a record with the same id exists.
    fn insert(&self, record: &BanRecord) -> Result<(), StoreError>;

    /// Overwrite an existing record.
    fn update(&self, record: &BanRecord) -> Result<(), StoreError>;
}

/// Run `op` against the store, giving up after `timeout`.
///
/// With no timeout the call runs inline. Otherwise it runs on a helper
/// thread; on expiry the call is abandoned and [`StoreError::Timeout`] is
/// returned, so the caller must not assume the write did not happen.
pub(crate) fn call_with_timeout<T, F>(
    store: &Arc<dyn BanStore>,
    timeout: Option<Duration>,
    op: F,
) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&dyn BanStore) -> Result<T, StoreError> + Send + 'static,
{
    let Some(timeout) = timeout else {
        return op(store.as_ref());
    };

    let store = Arc::clone(store);
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("ipban-store".to_string())
        .spawn(move || {
            let _ = tx.send(op(store.as_ref()));
        })
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(StoreError::Timeout),
        Err(RecvTimeoutError::Disconnected) => {
            Err(StoreError::Unavailable("store call aborted".to_string()))
        }
    }
}
