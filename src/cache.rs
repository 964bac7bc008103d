//! Read-through cache for ban checks.
//!
//! A [`CheckCache`] is owned by its caller (a request handler, a worker)
//! and sits in front of any [`BanLookup`]. Answers are served from the
//! cache for a bounded time; when the lookup behind it fails, a cached
//! affirmative answer is still honoured so a banned address stays banned.
//! Without one the failure propagates and the caller picks fail-open or
//! fail-closed.

use quick_cache::sync::Cache;
use std::time::{Duration, Instant};

use crate::address::AddressSpec;
use crate::error::Result;
use crate::record::BanRecord;
use crate::registry::{BanRegistry, RegistryConfig};
use crate::Category;

/// Source of ban answers.
pub trait BanLookup {
    /// Find the active ban of `category` containing `address`.
    fn lookup(&self, address: &AddressSpec, category: Category) -> Result<Option<BanRecord>>;
}

impl BanLookup for BanRegistry {
    fn lookup(&self, address: &AddressSpec, category: Category) -> Result<Option<BanRecord>> {
        Ok(self.check(address, category))
    }
}

#[derive(Clone)]
struct CachedAnswer {
    ban: Option<BanRecord>,
    at: Instant,
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Maximum cache capacity.
    pub capacity: usize,
    /// Current number of entries in the cache.
    pub len: usize,
}

/// Bounded, TTL-limited cache of check answers.
pub struct CheckCache {
    cache: Cache<(AddressSpec, Category), CachedAnswer>,
    capacity: usize,
    ttl: Duration,
}

impl CheckCache {
    /// Create a cache holding up to `capacity` answers for `ttl` each.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Cache::new(capacity.max(1)),
            capacity,
            ttl,
        }
    }

    /// Create a cache sized from registry configuration.
    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(config.cache_capacity, config.cache_ttl())
    }

    /// Check an address through the cache.
    pub fn check<L>(
        &self,
        lookup: &L,
        address: &AddressSpec,
        category: Category,
    ) -> Result<Option<BanRecord>>
    where
        L: BanLookup + ?Sized,
    {
        let key = (*address, category);
        let cached = self.cache.get(&key);

        if let Some(ref answer) = cached {
            if answer.at.elapsed() < self.ttl {
                return Ok(answer.ban.clone());
            }
        }

        match lookup.lookup(address, category) {
            Ok(ban) => {
                self.cache.insert(
                    key,
                    CachedAnswer {
                        ban: ban.clone(),
                        at: Instant::now(),
                    },
                );
                Ok(ban)
            }
            Err(e) => match cached.and_then(|answer| answer.ban) {
                Some(ban) => {
                    log::warn!(
                        "Ban lookup for {} failed ({}); serving cached ban {}",
                        address,
                        e,
                        ban.id
                    );
                    Ok(Some(ban))
                }
                None => Err(e),
            },
        }
    }

    /// Drop every cached answer, e.g. after bans were created or deleted.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            capacity: self.capacity,
            len: self.cache.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::record::CreatorId;
    use std::cell::{Cell, RefCell};

    /// Serves from a registry until told to fail.
    struct Flaky {
        registry: BanRegistry,
        failing: Cell<bool>,
        calls: RefCell<usize>,
    }

    impl Flaky {
        fn new() -> Self {
            let registry = BanRegistry::in_memory();
            registry
                .create_from_str("203.0.113.0/24", Category::Full, CreatorId(1), "spam")
                .unwrap();
            Self {
                registry,
                failing: Cell::new(false),
                calls: RefCell::new(0),
            }
        }
    }

    impl BanLookup for Flaky {
        fn lookup(&self, address: &AddressSpec, category: Category) -> Result<Option<BanRecord>> {
            *self.calls.borrow_mut() += 1;
            if self.failing.get() {
                return Err(Error::TransientStore("lookup timed out".to_string()));
            }
            self.registry.lookup(address, category)
        }
    }

    fn spec(s: &str) -> AddressSpec {
        AddressSpec::parse(s).unwrap()
    }

    #[test]
    fn test_fresh_answers_served_from_cache() {
        let source = Flaky::new();
        let cache = CheckCache::new(100, Duration::from_secs(60));

        let addr = spec("203.0.113.5");
        assert!(cache.check(&source, &addr, Category::Full).unwrap().is_some());
        assert!(cache.check(&source, &addr, Category::Full).unwrap().is_some());
        assert_eq!(*source.calls.borrow(), 1);
        assert_eq!(cache.stats().len, 1);

        // Category is part of the key
        assert!(cache.check(&source, &addr, Category::Partial).unwrap().is_none());
        assert_eq!(*source.calls.borrow(), 2);
    }

    #[test]
    fn test_expired_answers_are_refreshed() {
        let source = Flaky::new();
        let cache = CheckCache::new(100, Duration::ZERO);
        let addr = spec("203.0.113.5");
        cache.check(&source, &addr, Category::Full).unwrap();
        cache.check(&source, &addr, Category::Full).unwrap();
        assert_eq!(*source.calls.borrow(), 2);
    }

    #[test]
    fn test_failure_serves_cached_ban() {
        let source = Flaky::new();
        let cache = CheckCache::new(100, Duration::ZERO);
        let addr = spec("203.0.113.5");
        let first = cache.check(&source, &addr, Category::Full).unwrap();

        source.failing.set(true);
        let second = cache.check(&source, &addr, Category::Full).unwrap();
        assert_eq!(first.map(|r| r.id), second.map(|r| r.id));
    }

    #[test]
    fn test_failure_without_cached_ban_propagates() {
        let source = Flaky::new();
        let cache = CheckCache::new(100, Duration::ZERO);

        // Cached negative answers are not used as a fallback.
        let clean = spec("198.51.100.1");
        assert!(cache.check(&source, &clean, Category::Full).unwrap().is_none());

        source.failing.set(true);
        assert!(cache.check(&source, &clean, Category::Full).is_err());
        assert!(cache
            .check(&source, &spec("192.0.2.1"), Category::Full)
            .is_err());
    }

    #[test]
    fn test_clear() {
        let source = Flaky::new();
        let cache = CheckCache::from_config(&RegistryConfig::default());
        cache.check(&source, &spec("203.0.113.5"), Category::Full).unwrap();
        assert_eq!(cache.stats().len, 1);
        cache.clear();
        assert_eq!(cache.stats().len, 0);
        assert_eq!(cache.stats().capacity, 10_000);
    }
}
