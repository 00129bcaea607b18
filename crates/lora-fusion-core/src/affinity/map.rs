//! Atomically swapped task-affinity positions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::info;

use crate::error::EngineResult;
use crate::types::ExpertId;

use super::correlation::{correlation_matrix, distance_matrix};
use super::embedding::embed_2d;
use super::matrix::PerformanceMatrix;

/// Immutable set of positions from one recomputation.
#[derive(Debug, Clone, PartialEq)]
pub struct AffinitySnapshot {
    /// 0 for the empty initial snapshot.
    pub generation: u64,
    pub positions: HashMap<ExpertId, [f64; 2]>,
    pub stress: f64,
    pub computed_at: DateTime<Utc>,
}

impl AffinitySnapshot {
    fn empty() -> Self {
        Self {
            generation: 0,
            positions: HashMap::new(),
            stress: 0.0,
            computed_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn position(&self, id: &ExpertId) -> Option<[f64; 2]> {
        self.positions.get(id).copied()
    }

    /// Euclidean distance between two experts' positions, clamped to [0, 1].
    ///
    /// Experts without a position cost 0.0.
    #[must_use]
    pub fn fusion_cost(&self, a: &ExpertId, b: &ExpertId) -> f64 {
        match (self.positions.get(a), self.positions.get(b)) {
            (Some(pa), Some(pb)) => {
                let d = ((pa[0] - pb[0]).powi(2) + (pa[1] - pb[1]).powi(2)).sqrt();
                d.clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// 2-D task-affinity embedding of experts.
///
/// Readers load a whole snapshot; `recompute` builds a new one off to the
/// side and swaps it in with a single pointer store, so a partially updated
/// position table is never observable.
#[derive(Debug)]
pub struct TaskAffinityMap {
    snapshot: ArcSwap<AffinitySnapshot>,
    generation: AtomicU64,
    recompute_lock: Mutex<()>,
}

impl Default for TaskAffinityMap {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskAffinityMap {
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(AffinitySnapshot::empty()),
            generation: AtomicU64::new(0),
            recompute_lock: Mutex::new(()),
        }
    }

    /// Current snapshot. Hold it for the duration of one routing decision.
    #[must_use]
    pub fn snapshot(&self) -> Arc<AffinitySnapshot> {
        self.snapshot.load_full()
    }

    #[must_use]
    pub fn position(&self, id: &ExpertId) -> Option<[f64; 2]> {
        self.snapshot.load().position(id)
    }

    #[must_use]
    pub fn fusion_cost(&self, a: &ExpertId, b: &ExpertId) -> f64 {
        self.snapshot.load().fusion_cost(a, b)
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Replace every position from a performance matrix.
    ///
    /// Deterministic: the same matrix always yields the same positions.
    ///
    /// # Errors
    /// - `EngineError::InvalidPerformanceMatrix` if the matrix fails validation
    pub fn recompute(&self, matrix: &PerformanceMatrix) -> EngineResult<Arc<AffinitySnapshot>> {
        self.recompute_with(matrix, |_| {})
    }

    /// Like [`recompute`](Self::recompute), running `on_publish` after the
    /// new snapshot is stored and before the next recomputation can begin.
    ///
    /// # Errors
    /// - `EngineError::InvalidPerformanceMatrix` if the matrix fails validation
    pub fn recompute_with<F>(
        &self,
        matrix: &PerformanceMatrix,
        on_publish: F,
    ) -> EngineResult<Arc<AffinitySnapshot>>
    where
        F: FnOnce(&AffinitySnapshot),
    {
        matrix.validate()?;

        let _guard = self.recompute_lock.lock();

        let corr = correlation_matrix(&matrix.scores);
        let dist = distance_matrix(&corr);
        let embedding = embed_2d(&dist);

        let positions: HashMap<ExpertId, [f64; 2]> = matrix
            .expert_ids
            .iter()
            .cloned()
            .zip(embedding.positions)
            .collect();

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let snapshot = Arc::new(AffinitySnapshot {
            generation,
            positions,
            stress: embedding.stress,
            computed_at: Utc::now(),
        });
        self.snapshot.store(Arc::clone(&snapshot));
        on_publish(&snapshot);

        info!(
            generation,
            experts = matrix.num_experts(),
            datasets = matrix.num_datasets(),
            stress = embedding.stress,
            iterations = embedding.iterations,
            "Recomputed task affinity map"
        );
        Ok(snapshot)
    }
}
