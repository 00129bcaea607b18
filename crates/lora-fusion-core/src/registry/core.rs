//! ExpertRegistry implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::types::{Expert, ExpertId, StorageHandle};

/// Thread-safe registry of adapter metadata.
///
/// Reads take a shared lock and clone out; no lock is held across an await.
#[derive(Debug, Default)]
pub struct ExpertRegistry {
    experts: RwLock<HashMap<ExpertId, Expert>>,
    generation: AtomicU64,
}

impl ExpertRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new expert, or reactivate a deactivated one with fresh
    /// metadata.
    ///
    /// A reactivated expert keeps its affinity position until the next
    /// recomputation.
    ///
    /// # Errors
    /// - `EngineError::ExpertAlreadyRegistered` if the id is registered and active
    /// - `EngineError::ConfigError` if the id is empty
    pub fn register(
        &self,
        id: impl Into<ExpertId>,
        domain: impl Into<String>,
        tags: impl IntoIterator<Item = impl Into<String>>,
        storage: StorageHandle,
    ) -> EngineResult<Expert> {
        let id = id.into();
        if id.as_str().trim().is_empty() {
            return Err(EngineError::ConfigError {
                message: "expert id must not be empty".to_string(),
            });
        }

        let mut expert = Expert::new(id.clone(), domain, tags, storage);
        let mut experts = self.experts.write();
        if let Some(existing) = experts.get(&id) {
            if existing.active {
                return Err(EngineError::ExpertAlreadyRegistered {
                    id: id.to_string(),
                });
            }
            expert.position = existing.position;
            info!(expert = %id, "Reactivating expert");
        } else {
            info!(expert = %id, domain = %expert.domain, "Registering expert");
        }
        experts.insert(id, expert.clone());
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(expert)
    }

    /// Hide an expert from routing.
    ///
    /// Deactivating an already inactive expert is a no-op and does not bump
    /// the generation.
    ///
    /// # Errors
    /// - `EngineError::ExpertNotFound` if the id was never registered
    pub fn deactivate(&self, id: &ExpertId) -> EngineResult<()> {
        let mut experts = self.experts.write();
        let expert = experts
            .get_mut(id)
            .ok_or_else(|| EngineError::ExpertNotFound { id: id.to_string() })?;
        if expert.active {
            expert.active = false;
            self.generation.fetch_add(1, Ordering::AcqRel);
            info!(expert = %id, "Deactivated expert");
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &ExpertId) -> Option<Expert> {
        self.experts.read().get(id).cloned()
    }

    #[must_use]
    pub fn is_active(&self, id: &ExpertId) -> bool {
        self.experts.read().get(id).map(|e| e.active).unwrap_or(false)
    }

    /// Active experts sorted by id.
    #[must_use]
    pub fn active_experts(&self) -> Vec<Expert> {
        let mut active: Vec<Expert> = self
            .experts
            .read()
            .values()
            .filter(|e| e.active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.id.cmp(&b.id));
        active
    }

    /// Every registered id, active or not, sorted.
    #[must_use]
    pub fn all_ids(&self) -> Vec<ExpertId> {
        let mut ids: Vec<ExpertId> = self.experts.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.experts.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experts.read().is_empty()
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.experts.read().values().filter(|e| e.active).count()
    }

    /// Monotonic mutation counter.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Mirror affinity positions into expert records.
    ///
    /// Experts absent from `positions` have their position cleared. Called
    /// only by affinity recomputation, under a single write lock.
    pub(crate) fn set_positions(&self, positions: &HashMap<ExpertId, [f64; 2]>) {
        let mut experts = self.experts.write();
        for (id, expert) in experts.iter_mut() {
            expert.position = positions.get(id).copied();
        }
        debug!(count = positions.len(), "Mirrored affinity positions into registry");
    }
}
