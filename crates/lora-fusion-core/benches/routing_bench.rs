//! Routing and segmentation benchmarks.
//!
//! ```bash
//! cargo bench --package lora-fusion-core
//! cargo bench --package lora-fusion-core -- sparsegen
//! ```

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use lora_fusion_core::config::SegmenterConfig;
use lora_fusion_core::routing::sparsegen_project;
use lora_fusion_core::segmenter::{find_boundaries, split_units};
use lora_fusion_core::stubs::KeywordPerplexityOracle;
use lora_fusion_core::ClauseSegmenter;

const CANDIDATE_COUNTS: &[usize] = &[2, 8, 32, 128];
const LAMBDAS: &[f64] = &[0.0, 0.5, 0.95];

fn random_scores(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-4.0..4.0)).collect()
}

fn bench_sparsegen(c: &mut Criterion) {
    let mut group = c.benchmark_group("sparsegen");
    group.measurement_time(Duration::from_secs(3));

    for &n in CANDIDATE_COUNTS {
        let scores = random_scores(n, n as u64);
        group.throughput(Throughput::Elements(n as u64));
        for &lambda in LAMBDAS {
            group.bench_with_input(
                BenchmarkId::new(format!("lambda_{}", lambda), n),
                &scores,
                |b, scores| {
                    b.iter(|| sparsegen_project(black_box(scores), black_box(lambda), 1e-10))
                },
            );
        }
    }
    group.finish();
}

fn sample_text(sentences: usize) -> String {
    let pool = [
        "Solve: what is 15% of 200?",
        "Compute the sum of the first ten primes.",
        "Then write a short poem about it.",
        "Write a Rust function that parses the input.",
        "Hello there, friend.",
    ];
    (0..sentences)
        .map(|i| pool[i % pool.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

fn bench_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmentation");
    group.measurement_time(Duration::from_secs(3));

    let ppls = random_scores(512, 7)
        .into_iter()
        .map(|v| v.abs() + 1.0)
        .collect::<Vec<_>>();
    group.bench_function("find_boundaries_512", |b| {
        b.iter(|| find_boundaries(black_box(&ppls), black_box(0.5)))
    });

    let text = sample_text(64);
    group.bench_function("split_units_64", |b| {
        b.iter(|| split_units(black_box(&text), true))
    });

    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let segmenter = ClauseSegmenter::new(
        Arc::new(KeywordPerplexityOracle::new()),
        SegmenterConfig::default(),
    );
    for sentences in [4usize, 16, 64] {
        let text = sample_text(sentences);
        group.throughput(Throughput::Elements(sentences as u64));
        group.bench_with_input(
            BenchmarkId::new("segment_stub_oracle", sentences),
            &text,
            |b, text| b.to_async(&runtime).iter(|| segmenter.segment(black_box(text))),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_sparsegen, bench_segmentation);
criterion_main!(benches);
