//! Single-flight behavior of the semantic cache through the engine.

use std::sync::Arc;
use std::time::Duration;

use lora_fusion_core::stubs::TemplateGenerationBackend;
use lora_fusion_core::{FusionEngine, FusionRequestConfig, StorageHandle};

fn slow_engine(latency_ms: u64) -> (Arc<FusionEngine>, Arc<TemplateGenerationBackend>) {
    let backend = Arc::new(
        TemplateGenerationBackend::new().with_latency(Duration::from_millis(latency_ms)),
    );
    let engine = FusionEngine::builder()
        .backend(Arc::clone(&backend) as Arc<dyn lora_fusion_core::traits::GenerationBackend>)
        .with_stub_collaborators()
        .build()
        .expect("engine");
    engine
        .register_expert("math", "math", Vec::<String>::new(), StorageHandle::new("mem://math"))
        .expect("register");
    (Arc::new(engine), backend)
}

// =============================================================================
// COALESCING
// =============================================================================

#[tokio::test]
async fn test_concurrent_identical_requests_compute_once() {
    let (engine, backend) = slow_engine(100);
    const N: usize = 16;

    let handles: Vec<_> = (0..N)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .fuse_and_generate("What is 15% of 200?", FusionRequestConfig::default())
                    .await
            })
        })
        .collect();

    let mut results = Vec::with_capacity(N);
    for handle in handles {
        results.push(handle.await.unwrap().expect("fuse"));
    }

    eprintln!("[COALESCE] backend batch calls = {}", backend.batch_calls());
    assert_eq!(backend.batch_calls(), 1);
    assert!(results.iter().all(|r| r.text == results[0].text));
    assert_eq!(results.iter().filter(|r| r.cache_hit).count(), N - 1);

    let stats = engine.stats();
    assert_eq!(stats.cache.misses, 1);
    assert_eq!(stats.cache.coalesced, (N - 1) as u64);
    assert_eq!(stats.cache.in_flight, 0);
}

#[tokio::test]
async fn test_paraphrases_share_one_computation() {
    let (engine, backend) = slow_engine(50);

    let a = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine
                .fuse_and_generate("What is 15% of 200?", FusionRequestConfig::default())
                .await
        })
    };
    let b = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine
                .fuse_and_generate("what is 15% of 200", FusionRequestConfig::default())
                .await
        })
    };

    let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
    assert_eq!(a.text, b.text);
    assert!(a.cache_hit != b.cache_hit);
    assert_eq!(backend.batch_calls(), 1);
}

#[tokio::test]
async fn test_timed_out_leader_hands_over() {
    let (engine, backend) = slow_engine(80);

    let leader = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine
                .fuse_and_generate(
                    "What is 15% of 200?",
                    FusionRequestConfig::default().with_timeout_ms(30),
                )
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    let follower = engine
        .fuse_and_generate("What is 15% of 200?", FusionRequestConfig::default())
        .await
        .expect("follower recomputes");

    let leader = leader.await.unwrap();
    assert!(leader.unwrap_err().is_timeout());
    assert!(!follower.cache_hit);
    assert_eq!(backend.batch_calls(), 2);
}
