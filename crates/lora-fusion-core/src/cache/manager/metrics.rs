//! Thread-safe cache metrics with atomic counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Lock-free cache counters.
///
/// Relaxed ordering throughout; the counters are statistics, not
/// synchronization.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    /// Requests that joined an in-flight computation instead of starting one.
    pub coalesced: AtomicU64,
    pub stores: AtomicU64,
    /// Entries dropped because a near-duplicate replaced them.
    pub replacements: AtomicU64,
    /// Entries dropped by TTL or by failing hit validation.
    pub expirations: AtomicU64,
    /// Calls to `invalidate_all`.
    pub invalidations: AtomicU64,
}

impl CacheMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store(&self) {
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_replacements(&self, count: u64) {
        self.replacements.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_expirations(&self, count: u64) {
        self.expirations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self, entries: usize, in_flight: usize) -> CacheMetricsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let coalesced = self.coalesced.load(Ordering::Relaxed);
        let total = hits + misses + coalesced;
        CacheMetricsSnapshot {
            hits,
            misses,
            coalesced,
            stores: self.stores.load(Ordering::Relaxed),
            replacements: self.replacements.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            entries,
            in_flight,
            hit_rate: if total == 0 {
                0.0
            } else {
                (hits + coalesced) as f64 / total as f64
            },
        }
    }
}

/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub stores: u64,
    pub replacements: u64,
    pub expirations: u64,
    pub invalidations: u64,
    pub entries: usize,
    pub in_flight: usize,
    /// Share of requests served without a fresh computation.
    pub hit_rate: f64,
}
