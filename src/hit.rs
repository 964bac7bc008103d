//! Hit statistics for matched bans.

use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::{Error, Result};
use crate::record::{BanId, BanRecord};

/// A record shared between the registry and the hit tracker.
///
/// The record lock is what keeps `hit_count` and `last_hit_at` consistent:
/// both change under one write guard, so readers never see one without
/// the other.
pub(crate) type SharedRecord = Arc<RwLock<BanRecord>>;

/// Id → record map shared by the registry and its trackers.
pub(crate) type RecordIndex = Arc<RwLock<AHashMap<BanId, SharedRecord>>>;

/// Counts matches against bans.
///
/// Cloning is cheap; every clone updates the same records.
#[derive(Clone)]
pub struct HitTracker {
    index: RecordIndex,
}

impl HitTracker {
    pub(crate) fn new(index: RecordIndex) -> Self {
        Self { index }
    }

    /// Increment `hit_count` and stamp `last_hit_at` on a record.
    ///
    /// Concurrent calls against the same record are all counted.
    pub fn record_hit(&self, id: BanId) -> Result<()> {
        self.record_hit_at(id, SystemTime::now())
    }

    pub(crate) fn record_hit_at(&self, id: BanId, now: SystemTime) -> Result<()> {
        let record = self
            .index
            .read()
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound(id))?;
        record.write().register_hit(now);
        Ok(())
    }

    /// Current hit count of a record.
    pub fn hit_count(&self, id: BanId) -> Option<u64> {
        self.index.read().get(&id).map(|r| r.read().hit_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CreatorId;
    use crate::{AddressSpec, Category};
    use std::thread;

    fn tracker_with(id: u64) -> HitTracker {
        let record = BanRecord::new(
            BanId(id),
            AddressSpec::parse("198.51.100.7").unwrap(),
            Category::Full,
            CreatorId(1),
            "scraper",
            SystemTime::now(),
        );
        let index: RecordIndex = Arc::new(RwLock::new(AHashMap::new()));
        index
            .write()
            .insert(BanId(id), Arc::new(RwLock::new(record)));
        HitTracker::new(index)
    }

    #[test]
    fn test_record_hit() {
        let tracker = tracker_with(1);
        tracker.record_hit(BanId(1)).unwrap();
        assert_eq!(tracker.hit_count(BanId(1)), Some(1));
    }

    #[test]
    fn test_unknown_record() {
        let tracker = tracker_with(1);
        assert!(matches!(
            tracker.record_hit(BanId(99)),
            Err(Error::NotFound(BanId(99)))
        ));
        assert_eq!(tracker.hit_count(BanId(99)), None);
    }

    #[test]
    fn test_concurrent_hits_are_not_lost() {
        let tracker = tracker_with(1);
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        tracker.record_hit(BanId(1)).unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(tracker.hit_count(BanId(1)), Some(8000));
    }
}
