//! Caching layer for flag evaluations.
//!
//! [`TtlCache`] is the in-memory store with per-entry expiry. Callers that
//! want a shared, networked cache plug in any other [`CacheBackend`]
//! implementation instead.

mod key;
#[cfg(feature = "redis-cache")]
mod redis;

pub use key::{context_key, derive_key, KEY_PREFIX};
#[cfg(feature = "redis-cache")]
pub use self::redis::RedisCache;

use crate::Result;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// TTL applied to cached evaluations when none is configured.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Storage for cached values, keyed by string.
///
/// Implementations decide where entries live; the engine only relies on
/// this contract.
#[async_trait]
pub trait CacheBackend<V>: Send + Sync
where
    V: Send + 'static,
{
    /// Fetch a live entry. Expired entries are reported as missing.
    async fn get(&self, key: &str) -> Result<Option<V>>;

    /// Store an entry, replacing any previous one. `None` never expires.
    async fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<()>;

    /// Remove an entry if present.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Evict every expired entry.
    async fn clear_expired(&self) -> Result<()>;

    /// Remove every entry.
    async fn clear(&self) -> Result<()>;

    /// Number of stored entries.
    async fn len(&self) -> Result<usize>;
}

/// An in-memory cache with optional per-entry expiry.
///
/// Expired entries are evicted lazily on [`get`](TtlCache::get) or eagerly by
/// [`clear_expired`](TtlCache::clear_expired); until then they still count
/// towards [`len`](TtlCache::len).
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    /// Cache hit counter
    hits: AtomicU64,
    /// Cache miss counter
    misses: AtomicU64,
}

/// A cached value with its expiration time.
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }
}

impl<V: Clone> TtlCache<V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a live entry, evicting it if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get(key) {
            if !entry.is_expired(Instant::now()) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            entries.remove(key);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store an entry. Without a TTL the entry never expires.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let entry = CacheEntry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.lock().insert(key.into(), entry);
    }

    /// Remove an entry if present.
    pub fn delete(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    /// Evict every expired entry, returning how many were removed.
    pub fn clear_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            hits,
            misses,
            size: self.len(),
            hit_rate,
        }
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> CacheBackend<V> for TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>> {
        Ok(TtlCache::get(self, key))
    }

    async fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<()> {
        TtlCache::set(self, key, value, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        TtlCache::delete(self, key);
        Ok(())
    }

    async fn clear_expired(&self) -> Result<()> {
        let evicted = TtlCache::clear_expired(self);
        tracing::debug!(evicted, "expired cache entries evicted");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        TtlCache::clear(self);
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(TtlCache::len(self))
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Current cache size
    pub size: usize,
    /// Hit rate percentage
    pub hit_rate: f64,
}
