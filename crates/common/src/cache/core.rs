//! Core TTL cache implementation

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::trace;

use super::stats::{CacheStats, MetricsCollector};
use crate::time::{Clock, SystemClock};

/// Entry stored in the cache with its own time-to-live
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) > self.ttl
    }
}

/// Thread-safe string-keyed cache with per-entry TTL
///
/// Clones share storage and counters.
///
/// # Type Parameters
/// - `V`: Value type (must be `Clone`)
/// - `C`: Clock type for time-based operations (defaults to `SystemClock`)
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use propdesk_common::cache::TtlCache;
///
/// let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60));
/// cache.set("short".to_string(), 1, Duration::from_millis(10));
/// cache.insert("default".to_string(), 2);
/// assert_eq!(cache.get("default"), Some(2));
/// ```
pub struct TtlCache<V, C = SystemClock>
where
    V: Clone,
    C: Clock,
{
    entries: Arc<RwLock<HashMap<String, CacheEntry<V>>>>,
    default_ttl: Duration,
    metrics: MetricsCollector,
    clock: C,
}

impl<V: Clone> TtlCache<V, SystemClock> {
    /// Create a cache using the system clock
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, SystemClock)
    }
}

impl<V, C> TtlCache<V, C>
where
    V: Clone,
    C: Clock + Clone,
{
    /// Create a cache with a custom clock (useful for testing)
    pub fn with_clock(default_ttl: Duration, clock: C) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
            metrics: MetricsCollector::default(),
            clock,
        }
    }

    /// TTL applied by [`insert`](Self::insert)
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up a live entry
    ///
    /// An entry whose age has reached its TTL is removed and reported as
    /// absent.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();

        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => {
                    self.metrics.record_miss();
                    return None;
                }
                Some(entry) if !entry.is_expired(now) => {
                    self.metrics.record_hit();
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        // Re-check under the write lock; a concurrent set may have refreshed it.
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                self.metrics.record_hit();
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                trace!(key, "cache entry expired");
                self.metrics.record_expiration();
                self.metrics.record_miss();
                None
            }
            None => {
                self.metrics.record_miss();
                None
            }
        }
    }

    /// Store a value with an explicit TTL, replacing any previous entry
    pub fn set(&self, key: String, value: V, ttl: Duration) {
        let entry = CacheEntry { value, stored_at: self.clock.now(), ttl };
        self.entries.write().insert(key, entry);
        self.metrics.record_insert();
    }

    /// Store a value with the default TTL
    pub fn insert(&self, key: String, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Remove a single entry
    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.write().remove(key).map(|entry| entry.value)
    }

    /// Remove every entry whose key contains `pattern`, or everything when
    /// `pattern` is `None` or empty
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&self, pattern: Option<&str>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        match pattern {
            Some(pattern) if !pattern.is_empty() => entries.retain(|key, _| !key.contains(pattern)),
            _ => entries.clear(),
        }
        let removed = before - entries.len();
        drop(entries);

        if removed > 0 {
            trace!(pattern = pattern.unwrap_or("*"), removed, "cache invalidated");
            self.metrics.record_invalidations(removed);
        }
        removed
    }

    /// Drop all entries whose TTL has elapsed
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        for _ in 0..removed {
            self.metrics.record_expiration();
        }
        removed
    }

    /// Number of stored entries, including expired ones not yet read
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot(self.len())
    }
}

impl<V, C> Clone for TtlCache<V, C>
where
    V: Clone,
    C: Clock + Clone,
{
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            default_ttl: self.default_ttl,
            metrics: self.metrics.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<V, C> std::fmt::Debug for TtlCache<V, C>
where
    V: Clone,
    C: Clock,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("len", &self.entries.read().len())
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}
