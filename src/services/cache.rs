//! Key/value caching with per-entry TTL.
//!
//! [`Cache`] is the in-process store. [`CacheProvider`] is the pluggable
//! string-valued interface used by services, with JSON helpers layered on
//! top by [`CacheProviderExt`].

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::time::{Duration, Instant};
use tracing::warn;

use crate::error::Result;

/// A thread-safe cache with TTL support.
///
/// A zero TTL stores the entry without an expiry.
pub struct Cache<V> {
    data: DashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
}

struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

impl<V: Clone> Cache<V> {
    /// Create a new cache with the given default TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            data: DashMap::new(),
            default_ttl,
        }
    }

    /// Get a value, dropping it if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.data.get(key)?;
        if entry.is_live(Instant::now()) {
            Some(entry.value.clone())
        } else {
            drop(entry);
            self.data.remove(key);
            None
        }
    }

    /// Set a value in the cache with the default TTL.
    pub fn set(&self, key: String, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Set a value in the cache with a custom TTL.
    pub fn set_with_ttl(&self, key: String, value: V, ttl: Duration) {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };
        self.data.insert(key, CacheEntry { value, expires_at });
    }

    /// Check if a key exists and is not expired.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove a value from the cache.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.data.remove(key).map(|(_, entry)| entry.value)
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        self.data.clear();
    }

    /// Remove all expired entries from the cache.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.data.retain(|_, entry| entry.is_live(now));
    }

    /// Get the number of entries in the cache (including expired).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Pluggable cache backend storing serialized values.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Fetch the raw payload for `key`, `None` on a miss.
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`. A zero `ttl` means no expiry.
    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
}

/// JSON convenience methods for every [`CacheProvider`].
#[async_trait]
pub trait CacheProviderExt: CacheProvider {
    /// Decode a cached value. A payload that no longer decodes counts as a miss.
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get_raw(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Discarding undecodable cache entry {}: {}", key, e);
                Ok(None)
            }
        }
    }

    async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, raw, ttl).await
    }
}

impl<P: CacheProvider + ?Sized> CacheProviderExt for P {}

/// In-process [`CacheProvider`] backed by [`Cache`].
pub struct MemoryCacheProvider {
    cache: Cache<String>,
}

impl MemoryCacheProvider {
    pub fn new() -> Self {
        Self {
            cache: Cache::new(Duration::ZERO),
        }
    }

    /// Drop expired entries.
    pub fn cleanup(&self) {
        self.cache.cleanup();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for MemoryCacheProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cache.get(key))
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.cache.set_with_ttl(key.to_string(), value, ttl);
        Ok(())
    }
}
