//! Engine-level request counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::batch::SchedulerStats;
use crate::cache::CacheMetricsSnapshot;

#[derive(Debug, Default)]
pub(crate) struct EngineStatsInternal {
    requests_started: AtomicU64,
    requests_completed: AtomicU64,
    requests_failed: AtomicU64,
    requests_timed_out: AtomicU64,
    cache_hits: AtomicU64,
    clauses_fused: AtomicU64,
    clauses_fallback: AtomicU64,
}

impl EngineStatsInternal {
    #[inline]
    pub fn inc_started(&self) {
        self.requests_started.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_completed(&self) {
        self.requests_completed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_failed(&self, timed_out: bool) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        if timed_out {
            self.requests_timed_out.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_clauses(&self, fused: u64, fallback: u64) {
        self.clauses_fused.fetch_add(fused, Ordering::Relaxed);
        self.clauses_fallback.fetch_add(fallback, Ordering::Relaxed);
    }

    pub fn snapshot(&self, scheduler: SchedulerStats, cache: CacheMetricsSnapshot) -> EngineStats {
        EngineStats {
            requests_started: self.requests_started.load(Ordering::Relaxed),
            requests_completed: self.requests_completed.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            requests_timed_out: self.requests_timed_out.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            clauses_fused: self.clauses_fused.load(Ordering::Relaxed),
            clauses_fallback: self.clauses_fallback.load(Ordering::Relaxed),
            scheduler,
            cache,
        }
    }
}

/// Statistics snapshot for the engine and its shared services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub requests_started: u64,
    pub requests_completed: u64,
    pub requests_failed: u64,
    pub requests_timed_out: u64,
    /// Requests answered from the cache, including coalesced waits.
    pub cache_hits: u64,
    /// Clauses generated under an expert fusion.
    pub clauses_fused: u64,
    /// Clauses generated by the base model.
    pub clauses_fallback: u64,
    pub scheduler: SchedulerStats,
    pub cache: CacheMetricsSnapshot,
}
