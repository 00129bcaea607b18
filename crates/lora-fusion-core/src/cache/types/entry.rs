//! Cache entry with access metadata.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

use crate::types::FusionResult;

use super::fingerprint::{Fingerprint, VersionMarker};

/// Process start instant for relative timestamp storage.
pub(crate) static START_INSTANT: Lazy<Instant> = Lazy::new(Instant::now);

/// Cached fusion result.
///
/// `last_accessed` and `access_count` are atomics so hits can update them
/// under the shared read lock.
#[derive(Debug)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub marker: VersionMarker,
    pub result: Arc<FusionResult>,
    created_at: Instant,
    /// Nanos since process start
    last_accessed: AtomicU64,
    access_count: AtomicU32,
}

impl CacheEntry {
    #[must_use]
    pub fn new(fingerprint: Fingerprint, marker: VersionMarker, result: Arc<FusionResult>) -> Self {
        let now = START_INSTANT.elapsed().as_nanos() as u64;
        Self {
            fingerprint,
            marker,
            result,
            created_at: Instant::now(),
            last_accessed: AtomicU64::new(now),
            access_count: AtomicU32::new(0),
        }
    }

    /// Record a hit.
    pub fn touch(&self) {
        let now = START_INSTANT.elapsed().as_nanos() as u64;
        self.last_accessed.store(now, Ordering::Relaxed);
        self.access_count.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn access_count(&self) -> u32 {
        self.access_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    #[must_use]
    pub fn is_expired(&self, ttl: Option<Duration>) -> bool {
        ttl.map(|ttl| self.age() >= ttl).unwrap_or(false)
    }

    /// Last access as duration since process start.
    #[must_use]
    pub fn last_accessed(&self) -> Duration {
        Duration::from_nanos(self.last_accessed.load(Ordering::Relaxed))
    }
}
