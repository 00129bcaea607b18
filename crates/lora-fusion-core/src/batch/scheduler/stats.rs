//! Scheduler statistics.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// INTERNAL STATISTICS
// ============================================================================

#[derive(Debug, Default)]
pub(crate) struct SchedulerStatsInternal {
    pub(crate) requests_submitted: AtomicU64,
    pub(crate) batches_dispatched: AtomicU64,
    pub(crate) requests_completed: AtomicU64,
    pub(crate) requests_failed: AtomicU64,
    pub(crate) requests_detached: AtomicU64,
    pub(crate) batches_discarded: AtomicU64,
    pub(crate) largest_batch: AtomicUsize,
    pub(crate) queue_depth: AtomicUsize,
    pub(crate) active_batches: AtomicUsize,
}

impl SchedulerStatsInternal {
    pub fn snapshot(&self) -> SchedulerStats {
        let dispatched = self.batches_dispatched.load(Ordering::Relaxed);
        let completed = self.requests_completed.load(Ordering::Relaxed);
        let failed = self.requests_failed.load(Ordering::Relaxed);
        SchedulerStats {
            requests_submitted: self.requests_submitted.load(Ordering::Relaxed),
            batches_dispatched: dispatched,
            requests_completed: completed,
            requests_failed: failed,
            requests_detached: self.requests_detached.load(Ordering::Relaxed),
            batches_discarded: self.batches_discarded.load(Ordering::Relaxed),
            largest_batch: self.largest_batch.load(Ordering::Relaxed),
            current_queue_depth: self.queue_depth.load(Ordering::Relaxed),
            active_batches: self.active_batches.load(Ordering::Relaxed),
            avg_batch_size: if dispatched == 0 {
                0.0
            } else {
                (completed + failed) as f64 / dispatched as f64
            },
        }
    }

    #[inline]
    pub fn inc_requests_submitted(&self) {
        self.requests_submitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dispatch(&self, batch_size: usize) {
        self.batches_dispatched.fetch_add(1, Ordering::Relaxed);
        self.largest_batch.fetch_max(batch_size, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_requests_completed(&self, count: u64) {
        self.requests_completed.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_requests_failed(&self, count: u64) {
        self.requests_failed.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_requests_detached(&self, count: u64) {
        if count > 0 {
            self.requests_detached.fetch_add(count, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn inc_batches_discarded(&self) {
        self.batches_discarded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    #[inline]
    pub fn batch_started(&self) {
        self.active_batches.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn batch_finished(&self) {
        self.active_batches.fetch_sub(1, Ordering::Relaxed);
    }
}

// ============================================================================
// PUBLIC STATISTICS
// ============================================================================

/// Statistics snapshot for the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub requests_submitted: u64,
    pub batches_dispatched: u64,
    /// Members that received an output.
    pub requests_completed: u64,
    /// Members that received a batch failure.
    pub requests_failed: u64,
    /// Members pruned because their caller stopped waiting.
    pub requests_detached: u64,
    /// Batches dropped because every member detached.
    pub batches_discarded: u64,
    pub largest_batch: usize,
    /// Pending requests across all signature queues.
    pub current_queue_depth: usize,
    /// Batches currently inside the backend.
    pub active_batches: usize,
    pub avg_batch_size: f64,
}
