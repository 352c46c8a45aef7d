//! Cache statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of entries, expired-but-unread ones included
    pub size: usize,

    /// Reads that returned a live entry
    pub hits: u64,

    /// Reads that found nothing or an expired entry
    pub misses: u64,

    /// Total number of insert operations
    pub inserts: u64,

    /// Entries dropped because their TTL elapsed
    pub expirations: u64,

    /// Entries dropped by `invalidate`
    pub invalidations: u64,
}

impl CacheStats {
    /// Calculate hit rate (hits / total accesses)
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_accesses();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Total number of access operations (hits + misses)
    pub fn total_accesses(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Lock-free counters shared by clones of a cache
#[derive(Debug, Clone, Default)]
pub(crate) struct MetricsCollector {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    inserts: Arc<AtomicU64>,
    expirations: Arc<AtomicU64>,
    invalidations: Arc<AtomicU64>,
}

impl MetricsCollector {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalidations(&self, count: usize) {
        self.invalidations.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, size: usize) -> CacheStats {
        CacheStats {
            size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_without_accesses_is_zero() {
        assert!(CacheStats::default().hit_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn collector_snapshot_reflects_records() {
        let metrics = MetricsCollector::default();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_invalidations(3);

        let stats = metrics.snapshot(4);
        assert_eq!(stats.size, 4);
        assert_eq!(stats.total_accesses(), 3);
        assert_eq!(stats.invalidations, 3);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }
}
