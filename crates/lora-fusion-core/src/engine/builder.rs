//! FusionEngine construction.

use std::sync::Arc;

use crate::affinity::TaskAffinityMap;
use crate::batch::BatchedFusionScheduler;
use crate::cache::SemanticCache;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::registry::ExpertRegistry;
use crate::routing::SparsegenRouter;
use crate::segmenter::ClauseSegmenter;
use crate::stubs::{
    HashedNgramEmbedder, KeywordPerplexityOracle, KeywordRelevancePredictor,
    TemplateGenerationBackend,
};
use crate::traits::{GenerationBackend, PerplexityOracle, RelevancePredictor, TextEmbedder};

use super::core::FusionEngine;
use super::stats::EngineStatsInternal;

/// Wires collaborators and shared services into a [`FusionEngine`].
///
/// Oracle, predictor and backend are required. The embedder defaults to a
/// [`HashedNgramEmbedder`] of the configured fingerprint dimension; registry
/// and affinity map default to fresh empty instances.
#[derive(Default)]
pub struct FusionEngineBuilder {
    config: EngineConfig,
    registry: Option<Arc<ExpertRegistry>>,
    affinity: Option<Arc<TaskAffinityMap>>,
    oracle: Option<Arc<dyn PerplexityOracle>>,
    predictor: Option<Arc<dyn RelevancePredictor>>,
    backend: Option<Arc<dyn GenerationBackend>>,
    embedder: Option<Arc<dyn TextEmbedder>>,
}

impl FusionEngineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn registry(mut self, registry: Arc<ExpertRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn affinity(mut self, affinity: Arc<TaskAffinityMap>) -> Self {
        self.affinity = Some(affinity);
        self
    }

    #[must_use]
    pub fn oracle(mut self, oracle: Arc<dyn PerplexityOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    #[must_use]
    pub fn predictor(mut self, predictor: Arc<dyn RelevancePredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    #[must_use]
    pub fn embedder(mut self, embedder: Arc<dyn TextEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Fill every unset collaborator with its deterministic stub.
    #[must_use]
    pub fn with_stub_collaborators(mut self) -> Self {
        self.oracle
            .get_or_insert_with(|| Arc::new(KeywordPerplexityOracle::new()));
        self.predictor
            .get_or_insert_with(|| Arc::new(KeywordRelevancePredictor::new()));
        self.backend
            .get_or_insert_with(|| Arc::new(TemplateGenerationBackend::new()));
        self
    }

    /// Validate the configuration and start the batch scheduler.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// - `EngineError::ConfigError` if the configuration is invalid, a
    ///   required collaborator is missing, or the embedder dimension differs
    ///   from `cache.fingerprint_dim`
    /// - `EngineError::InternalError` if called outside a tokio runtime
    pub fn build(self) -> EngineResult<FusionEngine> {
        self.config.validate()?;
        let config = self.config;

        let oracle = self.oracle.ok_or_else(|| missing("perplexity oracle"))?;
        let predictor = self.predictor.ok_or_else(|| missing("relevance predictor"))?;
        let backend = self.backend.ok_or_else(|| missing("generation backend"))?;
        let embedder = self.embedder.unwrap_or_else(|| {
            Arc::new(HashedNgramEmbedder::new(config.cache.fingerprint_dim))
        });
        if embedder.dimension() != config.cache.fingerprint_dim {
            return Err(EngineError::ConfigError {
                message: format!(
                    "embedder dimension {} does not match cache.fingerprint_dim {}",
                    embedder.dimension(),
                    config.cache.fingerprint_dim
                ),
            });
        }

        let scheduler = BatchedFusionScheduler::start(Arc::clone(&backend), config.batch.clone())?;

        Ok(FusionEngine {
            registry: self.registry.unwrap_or_default(),
            affinity: self.affinity.unwrap_or_default(),
            segmenter: ClauseSegmenter::new(oracle, config.segmenter.clone()),
            router: Arc::new(SparsegenRouter::new(config.routing.clone())),
            cache: SemanticCache::new(embedder, config.cache.clone()),
            scheduler: Arc::new(scheduler),
            predictor,
            backend,
            stats: EngineStatsInternal::default(),
            config,
        })
    }
}

fn missing(what: &str) -> EngineError {
    EngineError::ConfigError {
        message: format!("{} is required", what),
    }
}
