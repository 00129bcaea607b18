//! FusionEngine: registration API and the request entry point.

use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::affinity::{AffinitySnapshot, PerformanceMatrix, TaskAffinityMap};
use crate::batch::BatchedFusionScheduler;
use crate::cache::{CacheSource, SemanticCache, VersionMarker};
use crate::config::{EngineConfig, FusionRequestConfig};
use crate::error::{EngineError, EngineResult};
use crate::registry::ExpertRegistry;
use crate::routing::SparsegenRouter;
use crate::segmenter::ClauseSegmenter;
use crate::traits::{GenerationBackend, RelevancePredictor};
use crate::types::{Expert, ExpertId, FusionResult, StorageHandle};

use super::builder::FusionEngineBuilder;
use super::pipeline::{generate_clauses, route_clauses, GenerationContext, RoutingContext};
use super::state::{RequestState, RequestStateMachine};
use super::stats::{EngineStats, EngineStatsInternal};

/// Clause-level dynamic adapter fusion.
///
/// Owns the shared services (registry, affinity map, semantic cache and
/// batch scheduler) and drives each request through
/// `SEGMENTING -> ROUTING -> (CACHE_HIT | GENERATING) -> DONE`.
///
/// # Example
///
/// ```rust,ignore
/// let engine = FusionEngine::builder().with_stub_collaborators().build()?;
/// engine.register_expert("math-lora", "math", ["arithmetic"], StorageHandle::new("mem://math"))?;
/// let result = engine
///     .fuse_and_generate("Solve: what is 15% of 200?", FusionRequestConfig::default())
///     .await?;
/// ```
pub struct FusionEngine {
    pub(super) config: EngineConfig,
    pub(super) registry: Arc<ExpertRegistry>,
    pub(super) affinity: Arc<TaskAffinityMap>,
    pub(super) segmenter: ClauseSegmenter,
    pub(super) router: Arc<SparsegenRouter>,
    pub(super) cache: SemanticCache,
    pub(super) scheduler: Arc<BatchedFusionScheduler>,
    pub(super) predictor: Arc<dyn RelevancePredictor>,
    pub(super) backend: Arc<dyn GenerationBackend>,
    pub(super) stats: EngineStatsInternal,
}

impl FusionEngine {
    #[must_use]
    pub fn builder() -> FusionEngineBuilder {
        FusionEngineBuilder::new()
    }

    // ========================================================================
    // REGISTRATION
    // ========================================================================

    /// Register (or reactivate) an expert and invalidate the cache.
    ///
    /// # Errors
    /// See [`ExpertRegistry::register`].
    pub fn register_expert(
        &self,
        id: impl Into<ExpertId>,
        domain: impl Into<String>,
        tags: impl IntoIterator<Item = impl Into<String>>,
        storage: StorageHandle,
    ) -> EngineResult<Expert> {
        let expert = self.registry.register(id, domain, tags, storage)?;
        self.cache.invalidate_all();
        Ok(expert)
    }

    /// Hide an expert from routing. Invalidates the cache if anything changed.
    ///
    /// # Errors
    /// - `EngineError::ExpertNotFound` if the id was never registered
    pub fn deactivate_expert(&self, id: &ExpertId) -> EngineResult<()> {
        let before = self.registry.generation();
        self.registry.deactivate(id)?;
        if self.registry.generation() != before {
            self.cache.invalidate_all();
        }
        Ok(())
    }

    /// Re-embed experts from an evaluation matrix and publish the positions.
    ///
    /// Every expert in the matrix must be registered (active or not). On
    /// failure the previous positions stay published.
    ///
    /// # Errors
    /// - `EngineError::ExpertNotFound` for an unregistered expert id
    /// - `EngineError::InvalidPerformanceMatrix` if the matrix is malformed
    pub fn recompute_affinity(
        &self,
        matrix: &PerformanceMatrix,
    ) -> EngineResult<Arc<AffinitySnapshot>> {
        if let Some(unknown) = matrix
            .expert_ids
            .iter()
            .find(|id| self.registry.get(id).is_none())
        {
            return Err(EngineError::ExpertNotFound {
                id: unknown.to_string(),
            });
        }

        let snapshot = self.affinity.recompute_with(matrix, |published| {
            self.registry.set_positions(&published.positions);
            self.cache.invalidate_all();
        })?;
        info!(
            generation = snapshot.generation,
            experts = snapshot.len(),
            stress = snapshot.stress,
            "Affinity positions published"
        );
        Ok(snapshot)
    }

    // ========================================================================
    // REQUESTS
    // ========================================================================

    /// Segment, route, fuse and generate one request.
    ///
    /// Clause outputs are concatenated in original clause order. A clause
    /// with no matching expert, or whose fusion weights stay numerically
    /// unstable, is generated by the base model without failing the request.
    ///
    /// # Errors
    /// - `EngineError::ConfigError` if `config` is invalid
    /// - `EngineError::SegmentationError` if the oracle fails
    /// - `EngineError::Timeout` if the deadline passes at any stage
    /// - `EngineError::BatchDispatchError` if the backend fails a batch
    /// - `EngineError::PredictorError` / `EngineError::BackendError` from collaborators
    pub async fn fuse_and_generate(
        &self,
        text: &str,
        config: FusionRequestConfig,
    ) -> EngineResult<FusionResult> {
        let request_id = Uuid::new_v4();
        let mut machine = RequestStateMachine::new(request_id);
        self.stats.inc_started();

        match self.run_request(request_id, text, config, &mut machine).await {
            Ok(result) => {
                self.stats.inc_completed();
                info!(
                    request_id = %request_id,
                    clauses = result.clauses.len(),
                    cache_hit = result.cache_hit,
                    elapsed_ms = machine.elapsed().as_millis() as u64,
                    "Request done"
                );
                Ok(result)
            }
            Err(e) => {
                self.stats.inc_failed(e.is_timeout());
                machine.fail(&e);
                Err(e)
            }
        }
    }

    async fn run_request(
        &self,
        request_id: Uuid,
        text: &str,
        config: FusionRequestConfig,
        machine: &mut RequestStateMachine,
    ) -> EngineResult<FusionResult> {
        let config = config.normalized()?;
        let deadline = Instant::now() + config.timeout();
        let marker = self.version_marker(&config);

        let registry = &self.registry;
        let validate = |result: &FusionResult| {
            result
                .referenced_experts()
                .into_iter()
                .all(|id| registry.is_active(id))
        };
        let config_ref = &config;
        let pipeline = &mut *machine;
        let compute = move || {
            let pipeline = pipeline;
            self.compute(request_id, text, config_ref, deadline, pipeline)
        };

        let cached = within(
            deadline,
            config.timeout_ms,
            "cache_wait",
            self.cache.get_or_compute(
                text,
                marker,
                config.cache_similarity_threshold,
                validate,
                compute,
            ),
        )
        .await?;

        match cached.source {
            CacheSource::Computed => {
                let current = self.version_marker(&config);
                if current != marker {
                    self.cache.prune_outdated(&current);
                }
                machine.transition(RequestState::Done)?;
                Ok(Arc::try_unwrap(cached.result).unwrap_or_else(|shared| (*shared).clone()))
            }
            CacheSource::Hit | CacheSource::Coalesced => {
                machine.transition(RequestState::CacheHit)?;
                self.stats.inc_cache_hits();
                debug!(request_id = %request_id, source = ?cached.source, "Served from cache");
                let result = cached.result.as_cache_hit(request_id);
                machine.transition(RequestState::Done)?;
                Ok(result)
            }
        }
    }

    async fn compute(
        &self,
        request_id: Uuid,
        text: &str,
        config: &FusionRequestConfig,
        deadline: Instant,
        machine: &mut RequestStateMachine,
    ) -> EngineResult<FusionResult> {
        let timeout_ms = config.timeout_ms;

        let clauses = within(
            deadline,
            timeout_ms,
            "segmentation",
            self.segmenter
                .segment_with_threshold(text, config.ppl_margin_threshold),
        )
        .await?;
        debug!(request_id = %request_id, clauses = clauses.len(), "Segmented request");

        machine.transition(RequestState::Routing)?;
        let routing = RoutingContext {
            predictor: Arc::clone(&self.predictor),
            router: Arc::clone(&self.router),
            experts: Arc::new(self.registry.active_experts()),
            snapshot: self.affinity.snapshot(),
            lambda_val: config.lambda_val,
        };
        let routed =
            within(deadline, timeout_ms, "routing", route_clauses(routing, clauses)).await?;

        machine.transition(RequestState::Generating)?;
        let generation = GenerationContext {
            scheduler: Arc::clone(&self.scheduler),
            backend: Arc::clone(&self.backend),
            batch_max_size: config.batch_max_size,
            batch_max_wait: config.batch_max_wait(),
        };
        let outputs = within(
            deadline,
            timeout_ms,
            "generation",
            generate_clauses(generation, text, routed),
        )
        .await?;

        let fallback = outputs.iter().filter(|o| o.fallback.is_some()).count() as u64;
        self.stats
            .add_clauses(outputs.len() as u64 - fallback, fallback);

        Ok(FusionResult::assemble(
            request_id,
            outputs,
            &self.config.request.output_separator,
        ))
    }

    /// State a cached result for `config` must have been computed under.
    #[must_use]
    pub fn version_marker(&self, config: &FusionRequestConfig) -> VersionMarker {
        VersionMarker {
            registry_generation: self.registry.generation(),
            affinity_generation: self.affinity.generation(),
            knob_digest: config.output_digest(),
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ExpertRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn affinity(&self) -> &Arc<TaskAffinityMap> {
        &self.affinity
    }

    #[must_use]
    pub fn cache(&self) -> &SemanticCache {
        &self.cache
    }

    #[must_use]
    pub fn segmenter(&self) -> &ClauseSegmenter {
        &self.segmenter
    }

    #[must_use]
    pub fn router(&self) -> &SparsegenRouter {
        &self.router
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
            .snapshot(self.scheduler.stats(), self.cache.metrics_snapshot())
    }

    /// Drain the batch scheduler. Later requests fail.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}

/// Run `fut` against the request deadline.
async fn within<T, F>(
    deadline: Instant,
    timeout_ms: u64,
    stage: &'static str,
    fut: F,
) -> EngineResult<T>
where
    F: Future<Output = EngineResult<T>>,
{
    tokio::time::timeout_at(deadline, fut)
        .await
        .unwrap_or(Err(EngineError::Timeout { stage, timeout_ms }))
}
