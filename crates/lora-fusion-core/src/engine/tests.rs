//! FusionEngine tests over the stub collaborators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::*;
use crate::affinity::PerformanceMatrix;
use crate::config::{EngineConfig, FusionRequestConfig};
use crate::error::{EngineError, EngineResult};
use crate::stubs::TemplateGenerationBackend;
use crate::traits::RelevancePredictor;
use crate::types::{Expert, ExpertId, FallbackReason, RoutingLogits, StorageHandle};

const MATH_THEN_POEM: &str = "Solve: what is 15% of 200? Then write a short poem about it.";

fn storage(id: &str) -> StorageHandle {
    StorageHandle::new(format!("mem://{}", id))
}

fn engine_with(backend: Arc<TemplateGenerationBackend>) -> FusionEngine {
    let engine = FusionEngine::builder()
        .backend(backend)
        .with_stub_collaborators()
        .build()
        .unwrap();
    engine
        .register_expert("math-lora", "math", ["arithmetic"], storage("math"))
        .unwrap();
    engine
        .register_expert("creative-lora", "creative", ["poem"], storage("creative"))
        .unwrap();
    engine
}

fn engine() -> (FusionEngine, Arc<TemplateGenerationBackend>) {
    let backend = Arc::new(TemplateGenerationBackend::new());
    (engine_with(Arc::clone(&backend)), backend)
}

fn dominant(weights: &crate::types::FusionWeights) -> String {
    weights.dominant().map(|(id, _)| id.to_string()).unwrap_or_default()
}

// ============================================================================
// END TO END
// ============================================================================

#[tokio::test]
async fn test_math_then_poem_routes_each_clause() {
    let (engine, _backend) = engine();
    let result = engine
        .fuse_and_generate(MATH_THEN_POEM, FusionRequestConfig::default())
        .await
        .unwrap();

    println!("result = {}", result.text);
    assert_eq!(result.clauses.len(), 2);
    assert_eq!(result.clauses[0].clause.text, "Solve: what is 15% of 200?");
    assert_eq!(result.clauses[1].clause.text, "Then write a short poem about it.");
    assert_eq!(dominant(&result.clauses[0].weights), "math-lora");
    assert_eq!(dominant(&result.clauses[1].weights), "creative-lora");
    assert_eq!(
        result.text,
        "[math-lora] Solve: what is 15% of 200? [creative-lora] Then write a short poem about it."
    );
    assert!(!result.cache_hit);
}

#[tokio::test]
async fn test_clause_order_survives_out_of_order_completion() {
    let (engine, backend) = engine();

    // The second clause matches no expert and goes straight to the base
    // model, finishing while the math clause still waits in its batch.
    let result = engine
        .fuse_and_generate(
            "Solve: what is 2 plus 3? Hello there, friend!",
            FusionRequestConfig::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.clauses.len(), 2);
    let order: Vec<usize> = result.clauses.iter().map(|c| c.clause.index).collect();
    assert_eq!(order, vec![0, 1]);
    assert_eq!(
        result.text,
        "[math-lora] Solve: what is 2 plus 3? [<base>] Hello there, friend!"
    );
    assert_eq!(backend.base_calls(), 1);
}

#[tokio::test]
async fn test_empty_text_yields_empty_result() {
    let (engine, backend) = engine();
    let result = engine
        .fuse_and_generate("   ", FusionRequestConfig::default())
        .await
        .unwrap();
    assert!(result.clauses.is_empty());
    assert_eq!(result.text, "");
    assert_eq!(backend.batch_calls(), 0);
}

// ============================================================================
// FALLBACK
// ============================================================================

#[tokio::test]
async fn test_unmatched_clause_uses_base_model() {
    let (engine, backend) = engine();
    let result = engine
        .fuse_and_generate("Hello there, friend.", FusionRequestConfig::default())
        .await
        .unwrap();

    assert_eq!(result.clauses.len(), 1);
    assert_eq!(result.clauses[0].fallback, Some(FallbackReason::NoCandidates));
    assert!(result.clauses[0].weights.is_empty());
    assert_eq!(result.text, "[<base>] Hello there, friend.");
    assert_eq!(backend.base_calls(), 1);
    assert_eq!(engine.stats().clauses_fallback, 1);
}

#[tokio::test]
async fn test_deactivated_expert_is_not_routed() {
    let (engine, _backend) = engine();
    engine.deactivate_expert(&ExpertId::from("math-lora")).unwrap();

    let result = engine
        .fuse_and_generate("What is 15% of 200?", FusionRequestConfig::default())
        .await
        .unwrap();
    assert_eq!(result.clauses[0].fallback, Some(FallbackReason::NoCandidates));
}

/// Returns logits for an expert that was never registered.
struct GhostPredictor;

#[async_trait]
impl RelevancePredictor for GhostPredictor {
    async fn predict(&self, _clause: &str, _experts: &[Expert]) -> EngineResult<RoutingLogits> {
        RoutingLogits::from_pairs([("ghost-lora", 3.0)])
    }
}

#[tokio::test]
async fn test_logits_for_unknown_experts_are_ignored() {
    let engine = FusionEngine::builder()
        .predictor(Arc::new(GhostPredictor))
        .with_stub_collaborators()
        .build()
        .unwrap();
    let result = engine
        .fuse_and_generate("Solve for x.", FusionRequestConfig::default())
        .await
        .unwrap();
    assert_eq!(result.clauses[0].fallback, Some(FallbackReason::NoCandidates));
}

/// Returns infinite logits for every expert.
struct OverflowPredictor;

#[async_trait]
impl RelevancePredictor for OverflowPredictor {
    async fn predict(&self, _clause: &str, experts: &[Expert]) -> EngineResult<RoutingLogits> {
        RoutingLogits::from_pairs(experts.iter().map(|e| (e.id.clone(), f64::INFINITY)))
    }
}

#[tokio::test]
async fn test_infinite_logits_are_sanitized() {
    let engine = FusionEngine::builder()
        .predictor(Arc::new(OverflowPredictor))
        .with_stub_collaborators()
        .build()
        .unwrap();
    engine.register_expert("a", "math", Vec::<String>::new(), storage("a")).unwrap();
    engine.register_expert("b", "code", Vec::<String>::new(), storage("b")).unwrap();

    let result = engine
        .fuse_and_generate("Solve for x.", FusionRequestConfig::default())
        .await
        .unwrap();
    let weights = &result.clauses[0].weights;
    assert!(result.clauses[0].fallback.is_none());
    assert!((weights.sum() - 1.0).abs() < 1e-6);
}

// ============================================================================
// CACHE
// ============================================================================

#[tokio::test]
async fn test_repeat_request_served_from_cache() {
    let (engine, backend) = engine();
    let first = engine
        .fuse_and_generate(MATH_THEN_POEM, FusionRequestConfig::default())
        .await
        .unwrap();
    let calls = backend.batch_calls();

    let second = engine
        .fuse_and_generate(
            "solve: what is 15% of 200? then write a short poem about it",
            FusionRequestConfig::default(),
        )
        .await
        .unwrap();

    assert!(second.cache_hit);
    assert_ne!(first.request_id, second.request_id);
    assert_eq!(first.text, second.text);
    assert_eq!(backend.batch_calls(), calls);
    assert_eq!(engine.stats().cache_hits, 1);
}

#[tokio::test]
async fn test_different_lambda_is_not_a_hit() {
    let (engine, _backend) = engine();
    engine
        .fuse_and_generate(MATH_THEN_POEM, FusionRequestConfig::default())
        .await
        .unwrap();
    let other = engine
        .fuse_and_generate(MATH_THEN_POEM, FusionRequestConfig::default().with_lambda(0.9))
        .await
        .unwrap();
    assert!(!other.cache_hit);
}

#[tokio::test]
async fn test_registry_change_invalidates_cache() {
    let (engine, _backend) = engine();
    engine
        .fuse_and_generate(MATH_THEN_POEM, FusionRequestConfig::default())
        .await
        .unwrap();
    assert_eq!(engine.cache().len(), 1);

    engine
        .register_expert("code-lora", "code", ["rust"], storage("code"))
        .unwrap();
    assert!(engine.cache().is_empty());

    let again = engine
        .fuse_and_generate(MATH_THEN_POEM, FusionRequestConfig::default())
        .await
        .unwrap();
    assert!(!again.cache_hit);
}

#[tokio::test]
async fn test_disabled_cache_always_computes() {
    let mut config = EngineConfig::default();
    config.cache.enabled = false;
    let backend = Arc::new(TemplateGenerationBackend::new());
    let engine = FusionEngine::builder()
        .config(config)
        .backend(Arc::clone(&backend) as Arc<dyn crate::traits::GenerationBackend>)
        .with_stub_collaborators()
        .build()
        .unwrap();
    engine.register_expert("math-lora", "math", Vec::<String>::new(), storage("m")).unwrap();

    for _ in 0..2 {
        let result = engine
            .fuse_and_generate("What is 15% of 200?", FusionRequestConfig::default())
            .await
            .unwrap();
        assert!(!result.cache_hit);
    }
    assert_eq!(backend.batch_calls(), 2);
}

// ============================================================================
// AFFINITY
// ============================================================================

#[tokio::test]
async fn test_recompute_affinity_publishes_positions() {
    let (engine, _backend) = engine();
    engine
        .fuse_and_generate(MATH_THEN_POEM, FusionRequestConfig::default())
        .await
        .unwrap();

    let matrix = PerformanceMatrix::new(
        vec![ExpertId::from("math-lora"), ExpertId::from("creative-lora")],
        vec![vec![0.9, 0.8, 0.2], vec![0.1, 0.3, 0.9]],
    )
    .unwrap();
    let snapshot = engine.recompute_affinity(&matrix).unwrap();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(engine.affinity().generation(), snapshot.generation);
    let expert = engine.registry().get(&ExpertId::from("math-lora")).unwrap();
    assert_eq!(expert.position, snapshot.position(&ExpertId::from("math-lora")));
    assert!(engine.cache().is_empty());
}

#[tokio::test]
async fn test_concurrent_recomputes_keep_registry_in_step() {
    let (engine, _backend) = engine();
    let ids = vec![ExpertId::from("math-lora"), ExpertId::from("creative-lora")];
    let opposed = PerformanceMatrix::new(
        ids.clone(),
        vec![vec![0.9, 0.8, 0.2], vec![0.1, 0.3, 0.9]],
    )
    .unwrap();
    let aligned = PerformanceMatrix::new(
        ids.clone(),
        vec![vec![0.9, 0.8, 0.2], vec![0.8, 0.7, 0.1]],
    )
    .unwrap();

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let engine = &engine;
            let (first, second) = if worker % 2 == 0 {
                (&opposed, &aligned)
            } else {
                (&aligned, &opposed)
            };
            scope.spawn(move || {
                for round in 0..25 {
                    let matrix = if round % 2 == 0 { first } else { second };
                    engine.recompute_affinity(matrix).unwrap();
                }
            });
        }
    });

    let snapshot = engine.affinity().snapshot();
    assert_eq!(snapshot.generation, 100);
    for id in &ids {
        let expert = engine.registry().get(id).unwrap();
        assert_eq!(expert.position, snapshot.position(id), "expert {}", id);
    }
}

#[tokio::test]
async fn test_recompute_affinity_rejects_unknown_expert() {
    let (engine, _backend) = engine();
    let matrix = PerformanceMatrix::new(
        vec![ExpertId::from("math-lora"), ExpertId::from("unknown-lora")],
        vec![vec![0.9, 0.8], vec![0.1, 0.3]],
    )
    .unwrap();
    let err = engine.recompute_affinity(&matrix).unwrap_err();
    assert!(matches!(err, EngineError::ExpertNotFound { ref id } if id == "unknown-lora"));
    assert_eq!(engine.affinity().generation(), 0);
}

// ============================================================================
// FAILURES
// ============================================================================

#[tokio::test]
async fn test_invalid_request_config_fails() {
    let (engine, _backend) = engine();
    let err = engine
        .fuse_and_generate(MATH_THEN_POEM, FusionRequestConfig::default().with_lambda(f64::NAN))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ConfigError { .. }));
    assert_eq!(engine.stats().requests_failed, 1);
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let backend =
        Arc::new(TemplateGenerationBackend::new().with_latency(Duration::from_millis(500)));
    let engine = engine_with(backend);

    let err = engine
        .fuse_and_generate(MATH_THEN_POEM, FusionRequestConfig::default().with_timeout_ms(50))
        .await
        .unwrap_err();
    println!("error = {}", err);
    assert!(matches!(err, EngineError::Timeout { stage: "generation", timeout_ms: 50 }));
    assert_eq!(engine.stats().requests_timed_out, 1);
    assert_eq!(engine.cache().in_flight(), 0);
}

#[tokio::test]
async fn test_backend_failure_fails_request() {
    let backend = Arc::new(TemplateGenerationBackend::new().failing_on("creative-lora"));
    let engine = engine_with(backend);

    let err = engine
        .fuse_and_generate(MATH_THEN_POEM, FusionRequestConfig::default())
        .await
        .unwrap_err();
    assert!(err.is_shared_batch_failure());
    assert!(engine.cache().is_empty());
}

#[tokio::test]
async fn test_builder_requires_collaborators() {
    let result = FusionEngine::builder().build();
    assert!(matches!(result, Err(EngineError::ConfigError { .. })));
}

#[tokio::test]
async fn test_builder_rejects_embedder_dimension_mismatch() {
    let result = FusionEngine::builder()
        .embedder(Arc::new(crate::stubs::HashedNgramEmbedder::new(64)))
        .with_stub_collaborators()
        .build();
    assert!(matches!(result, Err(EngineError::ConfigError { .. })));
}

#[tokio::test]
async fn test_requests_fail_after_shutdown() {
    let (engine, _backend) = engine();
    engine.shutdown().await;
    let err = engine
        .fuse_and_generate("What is 15% of 200?", FusionRequestConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InternalError { .. }));
}
