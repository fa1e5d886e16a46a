//! In-Memory Backend
//!
//! Process-local cache on top of moka. Expiration is enforced by moka; this
//! adapter only keeps the expiry instant next to the content so the remaining
//! lifetime can be reported.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use moka::sync::Cache;
use tracing::{debug, info, instrument};

use super::{lifetime, CacheBackend};
use crate::config::{BackendType, CacheConfig};
use crate::error::{CacheError, Result};

/// moka refuses lifetimes longer than 1000 years
const MAX_TTL: Duration = Duration::from_secs(1000 * 365 * 24 * 60 * 60);

// == Memory Item ==
/// Value stored in moka for each key.
#[derive(Debug, Clone)]
struct MemoryItem {
    content: Vec<u8>,
    expires_at: DateTime<Utc>,
}

// == Memory Backend ==
/// Native-TTL backend held entirely in process memory.
pub struct MemoryBackend {
    config: CacheConfig,
    ttl: TimeDelta,
    cache: Option<Cache<String, MemoryItem>>,
}

impl MemoryBackend {
    // == Constructor ==
    /// Creates an unopened backend; call `init` before use.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            ttl: TimeDelta::zero(),
            cache: None,
        }
    }

    fn cache(&self) -> Result<&Cache<String, MemoryItem>> {
        self.cache
            .as_ref()
            .ok_or(CacheError::NotInitialized(BackendType::InMemory))
    }
}

impl CacheBackend for MemoryBackend {
    #[instrument(skip(self), fields(backend = "in-memory"))]
    fn init(&mut self) -> Result<()> {
        if self.cache.is_some() {
            return Ok(());
        }

        if self.config.default_ttl > MAX_TTL {
            return Err(CacheError::init(
                BackendType::InMemory,
                "default_ttl exceeds 1000 years",
            ));
        }
        self.ttl = lifetime(&self.config)?;

        // Each insert restarts the entry's time_to_live.
        let cache = Cache::builder()
            .max_capacity(self.config.max_entries)
            .time_to_live(self.config.default_ttl)
            .build();
        self.cache = Some(cache);

        info!(
            "In-memory cache ready: max_entries={}, default_ttl={:?}",
            self.config.max_entries, self.config.default_ttl
        );
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "in-memory"))]
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.cache()?.get(key) {
            Some(item) => {
                debug!("Cache hit: {}", key);
                Ok(Some(item.content))
            }
            None => {
                debug!("Cache miss: {}", key);
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, content), fields(backend = "in-memory", len = content.len()))]
    fn set(&self, key: &str, content: &[u8]) -> Result<()> {
        let item = MemoryItem {
            content: content.to_vec(),
            expires_at: Utc::now() + self.ttl,
        };
        self.cache()?.insert(key.to_string(), item);
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "in-memory"))]
    fn get_ttl(&self, key: &str) -> Result<Option<TimeDelta>> {
        Ok(self
            .cache()?
            .get(key)
            .map(|item| item.expires_at - Utc::now()))
    }

    #[instrument(skip(self), fields(backend = "in-memory"))]
    fn delete(&self, key: &str) -> Result<()> {
        self.cache()?.invalidate(key);
        Ok(())
    }

    fn config(&self) -> &CacheConfig {
        &self.config
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn open(ttl: Duration) -> MemoryBackend {
        let config = CacheConfig {
            default_ttl: ttl,
            ..CacheConfig::default()
        };
        let mut backend = MemoryBackend::new(config);
        backend.init().unwrap();
        backend
    }

    #[test]
    fn test_memory_requires_init() {
        let backend = MemoryBackend::new(CacheConfig::default());

        assert!(matches!(
            backend.get("key"),
            Err(CacheError::NotInitialized(BackendType::InMemory))
        ));
        assert!(matches!(
            backend.set("key", b"value"),
            Err(CacheError::NotInitialized(_))
        ));
    }

    #[test]
    fn test_memory_init_twice_keeps_entries() {
        let mut backend = open(Duration::from_secs(60));
        backend.set("key", b"value").unwrap();

        backend.init().unwrap();

        assert_eq!(backend.get("key").unwrap(), Some(b"value".to_vec()));
    }

    #[test]
    fn test_memory_get_missing() {
        let backend = open(Duration::from_secs(60));
        assert_eq!(backend.get("missing").unwrap(), None);
        assert_eq!(backend.get_ttl("missing").unwrap(), None);
    }

    #[test]
    fn test_memory_set_and_get() {
        let backend = open(Duration::from_secs(60));

        backend.set("key1", b"value1").unwrap();
        assert_eq!(backend.get("key1").unwrap(), Some(b"value1".to_vec()));
    }

    #[test]
    fn test_memory_overwrite() {
        let backend = open(Duration::from_secs(60));

        backend.set("key1", b"value1").unwrap();
        backend.set("key1", b"value2").unwrap();

        assert_eq!(backend.get("key1").unwrap(), Some(b"value2".to_vec()));
    }

    #[test]
    fn test_memory_ttl_close_to_default() {
        let ttl = Duration::from_secs(600);
        let backend = open(ttl);

        backend.set("k", b"x").unwrap();
        let remaining = backend.get_ttl("k").unwrap().unwrap();

        assert!(remaining > TimeDelta::seconds(595));
        assert!(remaining <= TimeDelta::seconds(600));
    }

    #[test]
    fn test_memory_entry_expires() {
        let backend = open(Duration::from_secs(1));

        backend.set("key1", b"value1").unwrap();
        assert!(backend.get("key1").unwrap().is_some());

        sleep(Duration::from_millis(1500));

        assert_eq!(backend.get("key1").unwrap(), None);
        assert_eq!(backend.get_ttl("key1").unwrap(), None);
    }

    #[test]
    fn test_memory_extend_resets_lifetime() {
        let backend = open(Duration::from_secs(2));

        backend.set("key1", b"old").unwrap();
        sleep(Duration::from_millis(1200));
        backend.extend_ttl("key1", b"new").unwrap();
        sleep(Duration::from_millis(1200));

        assert_eq!(backend.get("key1").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn test_memory_delete() {
        let backend = open(Duration::from_secs(60));

        backend.set("key1", b"value1").unwrap();
        backend.delete("key1").unwrap();
        backend.delete("never-set").unwrap();

        assert_eq!(backend.get("key1").unwrap(), None);
    }
}
