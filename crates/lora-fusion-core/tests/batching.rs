//! Signature batching across concurrent requests.

use std::sync::Arc;
use std::time::Duration;

use lora_fusion_core::stubs::TemplateGenerationBackend;
use lora_fusion_core::{ExpertSignature, FusionEngine, FusionRequestConfig, StorageHandle};

fn engine(backend: Arc<TemplateGenerationBackend>) -> Arc<FusionEngine> {
    let engine = FusionEngine::builder()
        .backend(backend)
        .with_stub_collaborators()
        .build()
        .expect("engine");
    engine
        .register_expert("math", "math", Vec::<String>::new(), StorageHandle::new("mem://math"))
        .unwrap();
    engine
        .register_expert(
            "creative",
            "creative",
            Vec::<String>::new(),
            StorageHandle::new("mem://creative"),
        )
        .unwrap();
    Arc::new(engine)
}

async fn fuse_all(
    engine: &Arc<FusionEngine>,
    texts: &[&str],
    config: FusionRequestConfig,
) -> Vec<lora_fusion_core::EngineResult<lora_fusion_core::FusionResult>> {
    let handles: Vec<_> = texts
        .iter()
        .map(|text| {
            let engine = Arc::clone(engine);
            let text = text.to_string();
            let config = config.clone();
            tokio::spawn(async move { engine.fuse_and_generate(&text, config).await })
        })
        .collect();
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    results
}

// =============================================================================
// GROUPING
// =============================================================================

#[tokio::test]
async fn test_identical_supports_share_a_batch() {
    let backend = Arc::new(TemplateGenerationBackend::new());
    let engine = engine(Arc::clone(&backend));
    let config = FusionRequestConfig::default().with_batch_max_wait_ms(100);

    let results = fuse_all(&engine, &["What is 15% of 200?", "Calculate 9 times 7."], config).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let log = backend.batch_log();
    eprintln!("[BATCH] log = {:?}", log);
    assert_eq!(log, vec![(ExpertSignature::from_ids(["math"]), 2)]);
}

#[tokio::test]
async fn test_different_supports_are_dispatched_separately() {
    let backend = Arc::new(TemplateGenerationBackend::new());
    let engine = engine(Arc::clone(&backend));
    let config = FusionRequestConfig::default().with_batch_max_wait_ms(100);

    let results = fuse_all(&engine, &["What is 15% of 200?", "Write a short poem."], config).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let mut log = backend.batch_log();
    log.sort_by(|a, b| a.0.to_string().cmp(&b.0.to_string()));
    assert_eq!(
        log,
        vec![
            (ExpertSignature::from_ids(["creative"]), 1),
            (ExpertSignature::from_ids(["math"]), 1),
        ]
    );
}

#[tokio::test]
async fn test_batch_size_cap_splits_queue() {
    let backend = Arc::new(TemplateGenerationBackend::new());
    let engine = engine(Arc::clone(&backend));
    let config = FusionRequestConfig::default()
        .with_batch_max_wait_ms(200)
        .with_batch_max_size(2);

    let texts = [
        "What is 15% of 200?",
        "Calculate 9 times 7.",
        "Compute the square root of 81.",
        "What is 3 plus 4?",
    ];
    let results = fuse_all(&engine, &texts, config).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let sizes: Vec<usize> = backend.batch_log().iter().map(|(_, n)| *n).collect();
    assert_eq!(sizes, vec![2, 2]);
}

// =============================================================================
// DETACHMENT
// =============================================================================

#[tokio::test]
async fn test_timed_out_request_leaves_batch_cleanly() {
    let backend = Arc::new(TemplateGenerationBackend::new());
    let engine = engine(Arc::clone(&backend));

    let impatient = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine
                .fuse_and_generate(
                    "What is 15% of 200?",
                    FusionRequestConfig::default()
                        .with_batch_max_wait_ms(150)
                        .with_timeout_ms(20),
                )
                .await
        })
    };
    let patient = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine
                .fuse_and_generate(
                    "Calculate 9 times 7.",
                    FusionRequestConfig::default().with_batch_max_wait_ms(150),
                )
                .await
        })
    };

    let err = impatient.await.unwrap().unwrap_err();
    assert!(err.is_timeout());
    let ok = patient.await.unwrap().expect("patient request completes");
    assert_eq!(ok.text, "[math] Calculate 9 times 7.");

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(backend.batch_log(), vec![(ExpertSignature::from_ids(["math"]), 1)]);
    assert_eq!(engine.stats().scheduler.requests_detached, 1);
}
