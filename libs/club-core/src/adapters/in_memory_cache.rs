use crate::{Cache, CoreError};
use async_trait::async_trait;
use moka::{Expiry, future::Cache as MokaCache};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
struct CacheEntry {
    bytes: Arc<[u8]>,
    ttl: Option<Duration>,
}

/// Per-entry expiry: an explicit TTL wins, otherwise the cache default applies.
struct EntryExpiry {
    default_ttl: Duration,
}

impl EntryExpiry {
    fn ttl_of(&self, entry: &CacheEntry) -> Option<Duration> {
        Some(entry.ttl.unwrap_or(self.default_ttl))
    }
}

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        self.ttl_of(value)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        self.ttl_of(value)
    }
}

/// In-process implementation of the Cache port on top of Moka.
/// Used for single-instance deployments and tests.
#[derive(Clone)]
pub struct InMemoryCache {
    cache: MokaCache<String, CacheEntry>,
}

impl InMemoryCache {
    pub fn new(max_capacity: u64, default_ttl_seconds: u64) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry {
                default_ttl: Duration::from_secs(default_ttl_seconds),
            })
            .build();
        Self { cache }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(10_000, 3600)
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CoreError> {
        Ok(self.cache.get(key).await.map(|entry| entry.bytes.to_vec()))
    }

    async fn set(
        &self,
        key: &str,
        value: &[u8],
        ttl_seconds: Option<u64>,
    ) -> Result<(), CoreError> {
        let entry = CacheEntry {
            bytes: Arc::from(value),
            ttl: ttl_seconds.map(Duration::from_secs),
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}
