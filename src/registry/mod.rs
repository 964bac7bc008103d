//! The ban registry: active bans per category and the operations on them.

mod config;
mod import;
mod query;

pub use config::RegistryConfig;
pub use import::{ImportFailure, ImportReport};
pub use query::{BanOrder, BanQuery, Direction, OrderColumn};

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use std::cmp::Reverse;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::address::AddressSpec;
use crate::audit::{AuditSink, LogAuditSink};
use crate::error::{Error, ParseError, Result, StoreError};
use crate::hit::{HitTracker, RecordIndex, SharedRecord};
use crate::policy::{PolicyEngine, RejectionReason};
use crate::record::{AuditEvent, BanId, BanRecord, CreatorId};
use crate::store::{call_with_timeout, BanStore, MemoryStore};
use crate::Category;

/// A ban as held in a category list. The subnet is copied out of the
/// record so containment can be tested without taking the record lock.
struct BanEntry {
    id: BanId,
    subnet: AddressSpec,
    record: SharedRecord,
}

/// BanRegistry owns every ban record and answers match queries.
///
/// Each category has its own list behind a `RwLock` and its own writer
/// mutex. Checks take the read side of the list and may run concurrently.
/// `create` and `set_deleted` hold the writer mutex for the whole
/// check-then-act sequence, so at most one writer per category can pass
/// the overlap check at a time. Store calls run under the writer mutex
/// only; the list is write-locked just for the final push.
///
/// When several active bans contain an address, the most specific one
/// (longest prefix) is returned; equal prefixes go to the lowest id.
///
/// # Examples
/// ```
/// use ipban::{BanRegistry, Category, CreatorId};
///
/// let registry = BanRegistry::in_memory();
/// registry
///     .create_from_str("203.0.113.0/24", Category::Full, CreatorId(1), "spam ring")
///     .unwrap();
///
/// let addr = "203.0.113.5".parse().unwrap();
/// assert!(registry.check(&addr, Category::Full).is_some());
/// assert!(registry.check(&addr, Category::Partial).is_none());
/// ```
pub struct BanRegistry {
    categories: [RwLock<Vec<BanEntry>>; 2],
    writers: [Mutex<()>; 2],
    index: RecordIndex,
    hits: HitTracker,
    next_id: AtomicU64,
    store: Arc<dyn BanStore>,
    audit: Arc<dyn AuditSink>,
    config: RegistryConfig,
}

impl BanRegistry {
    /// Create an empty registry backed by a [`MemoryStore`] that logs
    /// audit events through `log`.
    pub fn new(config: RegistryConfig) -> Self {
        let store: Arc<dyn BanStore> = Arc::new(MemoryStore::new());
        Self::with_parts(store, Arc::new(LogAuditSink), config, Vec::new())
    }

    /// Empty in-memory registry with inline store calls.
    pub fn in_memory() -> Self {
        Self::new(RegistryConfig::without_timeout())
    }

    /// Open a registry over a store, loading every persisted record.
    pub fn open(
        store: Arc<dyn BanStore>,
        audit: Arc<dyn AuditSink>,
        config: RegistryConfig,
    ) -> Result<Self> {
        let records = call_with_timeout(&store, config.store_timeout(), |s| s.load_all())?;
        log::debug!("Loaded {} ban records from store", records.len());
        Ok(Self::with_parts(store, audit, config, records))
    }

    fn with_parts(
        store: Arc<dyn BanStore>,
        audit: Arc<dyn AuditSink>,
        config: RegistryConfig,
        records: Vec<BanRecord>,
    ) -> Self {
        let index: RecordIndex = Arc::new(RwLock::new(AHashMap::new()));
        let mut lists: [Vec<BanEntry>; 2] = [Vec::new(), Vec::new()];
        let mut max_id = 0;

        {
            let mut map = index.write();
            for record in records {
                max_id = max_id.max(record.id.0);
                let entry = BanEntry {
                    id: record.id,
                    subnet: record.subnet,
                    record: Arc::new(RwLock::new(record.clone())),
                };
                map.insert(record.id, Arc::clone(&entry.record));
                lists[record.category.index()].push(entry);
            }
        }

        let [full, partial] = lists;
        Self {
            categories: [RwLock::new(full), RwLock::new(partial)],
            writers: [Mutex::new(()), Mutex::new(())],
            hits: HitTracker::new(Arc::clone(&index)),
            index,
            next_id: AtomicU64::new(max_id + 1),
            store,
            audit,
            config,
        }
    }

    /// Whether a record participates in matching.
    pub fn is_active(record: &BanRecord) -> bool {
        record.is_active()
    }

    /// Configuration this registry was built with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// A handle for recording hits against this registry's records.
    pub fn hit_tracker(&self) -> HitTracker {
        self.hits.clone()
    }

    /// Total number of records, deleted ones included.
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of active records in a category.
    pub fn active_count(&self, category: Category) -> usize {
        self.list_for(category)
            .read()
            .iter()
            .filter(|e| e.record.read().is_active())
            .count()
    }

    /// Snapshot of a record by id.
    pub fn get(&self, id: BanId) -> Option<BanRecord> {
        self.index.read().get(&id).map(|r| r.read().clone())
    }

    fn list_for(&self, category: Category) -> &RwLock<Vec<BanEntry>> {
        &self.categories[category.index()]
    }

    fn writer_for(&self, category: Category) -> &Mutex<()> {
        &self.writers[category.index()]
    }

    /// Find the active ban of `category` whose subnet contains `address`.
    pub fn check(&self, address: &AddressSpec, category: Category) -> Option<BanRecord> {
        let bans = self.list_for(category).read();
        bans.iter()
            .filter(|e| e.subnet.contains(address))
            .filter_map(|e| {
                let record = e.record.read();
                record.is_active().then(|| record.clone())
            })
            .max_by_key(|r| (r.subnet.prefix_len(), Reverse(r.id)))
    }

    /// Check an address and, on a match, count the hit.
    ///
    /// Failing to count the hit never fails the check.
    pub fn hit(&self, address: &AddressSpec, category: Category) -> bool {
        let Some(ban) = self.check(address, category) else {
            return false;
        };
        if let Err(e) = self.hits.record_hit(ban.id) {
            log::warn!("Failed to record hit on ban {}: {}", ban.id, e);
        }
        true
    }

    /// Find an active ban of `category` overlapping `spec`.
    pub fn find_overlap(&self, spec: &AddressSpec, category: Category) -> Option<BanRecord> {
        let bans = self.list_for(category).read();
        bans.iter()
            .filter(|e| e.subnet.overlaps(spec))
            .find_map(|e| {
                let record = e.record.read();
                record.is_active().then(|| record.clone())
            })
    }

    /// Parse `address` and create a ban.
    ///
    /// Blank input is a policy rejection (`EmptyAddress`); malformed input
    /// is a parse error.
    pub fn create_from_str(
        &self,
        address: &str,
        category: Category,
        creator_id: CreatorId,
        reason: &str,
    ) -> Result<BanRecord> {
        let subnet = match AddressSpec::parse(address) {
            Ok(spec) => Some(spec),
            Err(ParseError::Empty) => None,
            Err(e) => return Err(e.into()),
        };
        self.create_validated(subnet, category, creator_id, reason)
    }

    /// Validate and create a ban on `subnet`.
    pub fn create(
        &self,
        subnet: AddressSpec,
        category: Category,
        creator_id: CreatorId,
        reason: &str,
    ) -> Result<BanRecord> {
        self.create_validated(Some(subnet), category, creator_id, reason)
    }

    fn create_validated(
        &self,
        subnet: Option<AddressSpec>,
        category: Category,
        creator_id: CreatorId,
        reason: &str,
    ) -> Result<BanRecord> {
        let writer = self.writer_for(category).lock();

        let overlap = subnet
            .as_ref()
            .map_or(false, |spec| self.find_overlap(spec, category).is_some());
        PolicyEngine::validate(subnet.as_ref(), category, true, overlap)
            .into_result()
            .map_err(Error::Rejected)?;
        let subnet = subnet.ok_or(Error::Rejected(RejectionReason::EmptyAddress))?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(Error::Rejected(RejectionReason::MissingReason));
        }

        let now = SystemTime::now();
        let mut record = BanRecord::new(self.allocate_id(), subnet, category, creator_id, reason, now);

        match self.persist_insert(&record) {
            Ok(()) => {}
            Err(StoreError::Conflict(msg)) => {
                // Another writer got there first. If it banned an overlapping
                // subnet the request is a duplicate; otherwise retry once.
                log::debug!("Insert of {} conflicted: {}", record.subnet, msg);
                if self.stored_overlap(&record.subnet, category)? {
                    return Err(Error::Rejected(RejectionReason::AlreadyBanned));
                }
                record.id = self.allocate_id();
                self.persist_insert(&record)?;
            }
            Err(e) => return Err(e.into()),
        }

        let shared = Arc::new(RwLock::new(record.clone()));
        self.index.write().insert(record.id, Arc::clone(&shared));
        self.list_for(category).write().push(BanEntry {
            id: record.id,
            subnet: record.subnet,
            record: shared,
        });
        drop(writer);

        log::debug!("Created {} ban {} on {}", category, record.id, record.subnet);
        self.emit(AuditEvent::Created, &record, creator_id);
        Ok(record)
    }

    /// Whether the store holds an active ban of `category` overlapping
    /// `spec`, as committed by writers this registry has not seen.
    fn stored_overlap(&self, spec: &AddressSpec, category: Category) -> Result<bool> {
        let stored = call_with_timeout(&self.store, self.config.store_timeout(), |s| s.load_all())?;
        if let Some(max) = stored.iter().map(|r| r.id.0).max() {
            self.next_id.fetch_max(max + 1, Ordering::SeqCst);
        }
        Ok(stored
            .iter()
            .any(|r| r.category == category && r.is_active() && r.subnet.overlaps(spec)))
    }

    fn allocate_id(&self) -> BanId {
        BanId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn persist_insert(&self, record: &BanRecord) -> std::result::Result<(), StoreError> {
        let record = record.clone();
        call_with_timeout(&self.store, self.config.store_timeout(), move |s| {
            s.insert(&record)
        })
    }

    fn persist_update(&self, record: &BanRecord) -> Result<()> {
        let record = record.clone();
        call_with_timeout(&self.store, self.config.store_timeout(), move |s| {
            s.update(&record)
        })
        .map_err(Error::from)
    }

    /// Soft-delete (`true`) or restore (`false`) a ban.
    ///
    /// The audit sink hears about actual transitions only; setting a ban
    /// to the state it is already in changes nothing.
    pub fn set_deleted(&self, id: BanId, deleted: bool, actor: CreatorId) -> Result<BanRecord> {
        let shared = self
            .index
            .read()
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound(id))?;
        let category = shared.read().category;
        let writer = self.writer_for(category).lock();

        let mut next = shared.read().clone();
        let Some(event) = next.set_deleted(deleted, SystemTime::now()) else {
            return Ok(next);
        };

        // No list or record lock is held across the store call, so checks
        // and hits in this category keep running.
        self.persist_update(&next)?;
        let updated = {
            let mut record = shared.write();
            record.is_deleted = next.is_deleted;
            record.updated_at = next.updated_at;
            record.clone()
        };
        drop(writer);

        log::debug!("Ban {} {}", id, if deleted { "deleted" } else { "restored" });
        self.emit(event, &updated, actor);
        Ok(updated)
    }

    /// Write current hit statistics of every hit record to the store.
    ///
    /// Hits are counted in memory; this persists them. Returns the number
    /// of records written.
    pub fn flush_hits(&self) -> Result<usize> {
        let hit: Vec<BanRecord> = self
            .index
            .read()
            .values()
            .map(|r| r.read().clone())
            .filter(|r| r.last_hit_at.is_some())
            .collect();
        for record in &hit {
            self.persist_update(record)?;
        }
        Ok(hit.len())
    }

    /// List records matching a query.
    pub fn list(&self, query: &BanQuery) -> Vec<BanRecord> {
        let snapshot: Vec<BanRecord> = self
            .index
            .read()
            .values()
            .map(|r| r.read().clone())
            .collect();
        query.apply(snapshot)
    }

    fn emit(&self, event: AuditEvent, record: &BanRecord, actor: CreatorId) {
        if let Err(e) = self.audit.notify(event, record, actor) {
            log::warn!("Audit sink rejected {} for ban {}: {}", event, record.id, e);
        }
    }
}
