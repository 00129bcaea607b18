//! SemanticCache implementation.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::cache::types::{CacheEntry, Fingerprint, VersionMarker};
use crate::config::CacheConfig;
use crate::error::{EngineError, EngineResult};
use crate::traits::TextEmbedder;
use crate::types::FusionResult;

use super::inflight::{wait_for, InflightSlot, SlotState};
use super::metrics::{CacheMetrics, CacheMetricsSnapshot};

/// How a `get_or_compute` call was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    /// A stored entry matched.
    Hit,
    /// This caller ran the computation.
    Computed,
    /// Another caller's in-flight computation was shared.
    Coalesced,
}

/// Result of `get_or_compute`.
#[derive(Debug, Clone)]
pub struct CachedResult {
    pub result: Arc<FusionResult>,
    pub source: CacheSource,
}

/// Near-duplicate-tolerant fusion result cache.
///
/// # Thread Safety
///
/// - entries: `RwLock`, lookups share a read lock
/// - in-flight slots: `Mutex`, held only to register, find or retire a slot
/// - lock order is always in-flight before entries
///
/// No lock is held while a computation runs.
pub struct SemanticCache {
    embedder: Arc<dyn TextEmbedder>,
    config: CacheConfig,
    entries: RwLock<Vec<CacheEntry>>,
    inflight: Mutex<Vec<InflightSlot>>,
    next_slot_id: AtomicU64,
    /// Bumped by `invalidate_all`; computations begun earlier are not stored.
    epoch: AtomicU64,
    metrics: CacheMetrics,
}

impl SemanticCache {
    #[must_use]
    pub fn new(embedder: Arc<dyn TextEmbedder>, config: CacheConfig) -> Self {
        Self {
            embedder,
            config,
            entries: RwLock::new(Vec::new()),
            inflight: Mutex::new(Vec::new()),
            next_slot_id: AtomicU64::new(1),
            epoch: AtomicU64::new(0),
            metrics: CacheMetrics::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Fingerprint `text` with the configured embedder.
    ///
    /// # Errors
    /// - `EngineError::EmbedderError` if embedding fails
    pub fn fingerprint(&self, text: &str) -> EngineResult<Fingerprint> {
        let vector = self.embedder.embed(text)?;
        Ok(Fingerprint::new(text, vector))
    }

    fn ttl(&self) -> Option<Duration> {
        self.config.ttl_seconds.map(Duration::from_secs)
    }

    /// Look up a stored result without side effects on cache contents
    /// beyond access statistics.
    ///
    /// # Errors
    /// - `EngineError::EmbedderError` if fingerprinting fails
    pub fn lookup(
        &self,
        text: &str,
        marker: &VersionMarker,
        threshold: f32,
    ) -> EngineResult<Option<Arc<FusionResult>>> {
        self.lookup_with(text, marker, threshold, |_| true)
    }

    /// Look up, treating hits rejected by `validate` as misses.
    ///
    /// # Errors
    /// - `EngineError::EmbedderError` if fingerprinting fails
    pub fn lookup_with<V>(
        &self,
        text: &str,
        marker: &VersionMarker,
        threshold: f32,
        validate: V,
    ) -> EngineResult<Option<Arc<FusionResult>>>
    where
        V: Fn(&FusionResult) -> bool,
    {
        if !self.config.enabled {
            return Ok(None);
        }
        let fingerprint = self.fingerprint(text)?;
        let found = self.find_hit(&fingerprint, marker, threshold, &validate);
        if found.is_some() {
            self.metrics.record_hit();
        } else {
            self.metrics.record_miss();
        }
        Ok(found)
    }

    /// Best valid match above `threshold`, touching it on success.
    fn find_hit<V>(
        &self,
        fingerprint: &Fingerprint,
        marker: &VersionMarker,
        threshold: f32,
        validate: &V,
    ) -> Option<Arc<FusionResult>>
    where
        V: Fn(&FusionResult) -> bool,
    {
        let ttl = self.ttl();
        let entries = self.entries.read();
        let best = entries
            .iter()
            .filter(|e| e.marker == *marker && !e.is_expired(ttl))
            .filter(|e| e.fingerprint.matches(fingerprint, threshold))
            .max_by(|a, b| {
                a.fingerprint
                    .similarity(fingerprint)
                    .total_cmp(&b.fingerprint.similarity(fingerprint))
            })?;

        if !validate(&best.result) {
            debug!(
                request_id = %best.result.request_id,
                "Cached result references inactive experts, treating as miss"
            );
            return None;
        }
        best.touch();
        Some(Arc::clone(&best.result))
    }

    /// Store a result, replacing near-duplicates computed under the same
    /// marker and pruning expired entries.
    ///
    /// # Errors
    /// - `EngineError::EmbedderError` if fingerprinting fails
    pub fn store(
        &self,
        text: &str,
        marker: VersionMarker,
        threshold: f32,
        result: FusionResult,
    ) -> EngineResult<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let fingerprint = self.fingerprint(text)?;
        self.insert_entry(fingerprint, marker, threshold, Arc::new(result));
        Ok(())
    }

    fn insert_entry(
        &self,
        fingerprint: Fingerprint,
        marker: VersionMarker,
        threshold: f32,
        result: Arc<FusionResult>,
    ) {
        let ttl = self.ttl();
        let mut entries = self.entries.write();

        if entries.iter().any(|e| marker.is_superseded_by(&e.marker)) {
            debug!(?marker, "Skipping store under an outdated version marker");
            return;
        }

        let before = entries.len();
        entries.retain(|e| !e.is_expired(ttl) && !e.marker.is_superseded_by(&marker));
        let expired = before - entries.len();

        let before = entries.len();
        entries.retain(|e| !(e.marker == marker && e.fingerprint.matches(&fingerprint, threshold)));
        let replaced = before - entries.len();

        entries.push(CacheEntry::new(fingerprint, marker, result));

        self.metrics.record_store();
        self.metrics.record_expirations(expired as u64);
        self.metrics.record_replacements(replaced as u64);
        debug!(entries = entries.len(), replaced, expired, "Stored cache entry");
    }

    /// Return a cached result or run `compute`, at most once per
    /// near-duplicate bucket across concurrent callers.
    ///
    /// A hit rejected by `validate` counts as a miss. If the computing caller
    /// fails or is dropped, waiting callers retry and one of them computes.
    ///
    /// # Errors
    /// - `EngineError::EmbedderError` if fingerprinting fails
    /// - whatever `compute` returns, for the caller that ran it
    pub async fn get_or_compute<V, F, Fut>(
        &self,
        text: &str,
        marker: VersionMarker,
        threshold: f32,
        validate: V,
        compute: F,
    ) -> EngineResult<CachedResult>
    where
        V: Fn(&FusionResult) -> bool,
        F: FnOnce() -> Fut,
        Fut: Future<Output = EngineResult<FusionResult>>,
    {
        if !self.config.enabled {
            let result = compute().await?;
            return Ok(CachedResult {
                result: Arc::new(result),
                source: CacheSource::Computed,
            });
        }

        let fingerprint = self.fingerprint(text)?;
        let mut compute = Some(compute);

        loop {
            let role = {
                let mut inflight = self.inflight.lock();
                if let Some(result) = self.find_hit(&fingerprint, &marker, threshold, &validate) {
                    self.metrics.record_hit();
                    return Ok(CachedResult {
                        result,
                        source: CacheSource::Hit,
                    });
                }
                match inflight
                    .iter()
                    .find(|slot| slot.covers(&fingerprint, &marker, threshold))
                {
                    Some(slot) => Role::Waiter(slot.tx.subscribe()),
                    None => {
                        let id = self.next_slot_id.fetch_add(1, Ordering::Relaxed);
                        let epoch = self.epoch.load(Ordering::Acquire);
                        inflight.push(InflightSlot::new(id, epoch, marker, fingerprint.clone()));
                        Role::Leader(id)
                    }
                }
            };

            match role {
                Role::Waiter(rx) => {
                    self.metrics.record_coalesced();
                    match wait_for(rx).await {
                        SlotState::Ready(result) => {
                            return Ok(CachedResult {
                                result,
                                source: CacheSource::Coalesced,
                            });
                        }
                        _ => {
                            debug!("In-flight computation abandoned, retrying");
                            continue;
                        }
                    }
                }
                Role::Leader(id) => {
                    self.metrics.record_miss();
                    let guard = LeaderGuard {
                        cache: self,
                        id,
                        completed: false,
                    };
                    let compute = compute.take().ok_or_else(|| EngineError::InternalError {
                        message: "cache computation already consumed".to_string(),
                    })?;

                    let result = Arc::new(compute().await?);
                    guard.complete(threshold, Arc::clone(&result));
                    return Ok(CachedResult {
                        result,
                        source: CacheSource::Computed,
                    });
                }
            }
        }
    }

    /// Drop every entry.
    ///
    /// Computations already in flight still deliver to their waiters but are
    /// not stored.
    pub fn invalidate_all(&self) {
        let _inflight = self.inflight.lock();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let mut entries = self.entries.write();
        let dropped = entries.len();
        entries.clear();
        self.metrics.record_invalidation();
        info!(dropped, "Invalidated semantic cache");
    }

    /// Drop entries computed under generations older than `current`.
    ///
    /// Returns the number of entries removed.
    pub fn prune_outdated(&self, current: &VersionMarker) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| !e.marker.is_superseded_by(current));
        let pruned = before - entries.len();
        if pruned > 0 {
            self.metrics.record_expirations(pruned as u64);
            debug!(pruned, "Pruned entries with outdated version markers");
        }
        pruned
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().len()
    }

    #[must_use]
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics.snapshot(self.len(), self.in_flight())
    }
}

enum Role {
    Leader(u64),
    Waiter(tokio::sync::watch::Receiver<SlotState>),
}

/// Retires a leader's slot. Dropping it without `complete` abandons the
/// slot so waiters retry.
struct LeaderGuard<'a> {
    cache: &'a SemanticCache,
    id: u64,
    completed: bool,
}

impl LeaderGuard<'_> {
    fn complete(mut self, threshold: f32, result: Arc<FusionResult>) {
        self.completed = true;
        let cache = self.cache;

        let mut inflight = cache.inflight.lock();
        if let Some(pos) = inflight.iter().position(|s| s.id == self.id) {
            let slot = inflight.swap_remove(pos);
            if slot.epoch == cache.epoch.load(Ordering::Acquire) {
                cache.insert_entry(
                    slot.fingerprint.clone(),
                    slot.marker,
                    threshold,
                    Arc::clone(&result),
                );
            }
            let _ = slot.tx.send(SlotState::Ready(result));
        }
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let mut inflight = self.cache.inflight.lock();
        if let Some(pos) = inflight.iter().position(|s| s.id == self.id) {
            let slot = inflight.swap_remove(pos);
            let _ = slot.tx.send(SlotState::Abandoned);
        }
    }
}
