//! Registry configuration.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default bound on a single store call.
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

/// Default check cache capacity (number of entries).
const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Default lifetime of a cached check answer.
const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Configuration for a [`BanRegistry`](super::BanRegistry) and the
/// [`CheckCache`](crate::CheckCache) in front of it.
///
/// Loadable from YAML; missing keys fall back to defaults:
///
/// ```yaml
/// store_timeout_ms: 2000
/// cache_capacity: 50000
/// cache_ttl_secs: 30
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Bound on each store call; `None` runs store calls inline.
    pub store_timeout_ms: Option<u64>,
    /// Maximum number of cached check answers.
    pub cache_capacity: usize,
    /// How long a cached answer is served without asking the registry.
    pub cache_ttl_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: Some(DEFAULT_STORE_TIMEOUT_MS),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl RegistryConfig {
    /// Configuration that runs store calls inline, without a timeout.
    pub fn without_timeout() -> Self {
        Self {
            store_timeout_ms: None,
            ..Self::default()
        }
    }

    /// Set the store call bound.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    /// Store call bound as a `Duration`.
    pub fn store_timeout(&self) -> Option<Duration> {
        self.store_timeout_ms.map(Duration::from_millis)
    }

    /// Cache entry lifetime as a `Duration`.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.store_timeout_ms == Some(0) {
            return Err(Error::Config(
                "store_timeout_ms must be positive (omit it to disable the timeout)".to_string(),
            ));
        }
        Ok(())
    }
}
