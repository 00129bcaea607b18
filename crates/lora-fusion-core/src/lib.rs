//! LoRA Fusion Core Library
//!
//! Clause-level dynamic adapter fusion: a request is split into clauses at
//! perplexity minima, each clause is routed to a sparse weighted blend of
//! registered experts, and clauses sharing an expert set are generated in
//! one batched backend call.
//!
//! # Architecture
//!
//! This crate defines:
//! - Shared services: [`ExpertRegistry`], [`TaskAffinityMap`], [`SemanticCache`]
//!   and [`BatchedFusionScheduler`]
//! - Per-request stages: [`ClauseSegmenter`] and [`SparsegenRouter`]
//! - The orchestrating [`FusionEngine`] and its request state machine
//! - Collaborator traits (perplexity oracle, relevance predictor, generation
//!   backend, text embedder) with deterministic stubs
//! - Error types and configuration structures
//!
//! # Example
//!
//! ```
//! use lora_fusion_core::routing::sparsegen_project;
//!
//! let weights = sparsegen_project(&[2.0, 1.0, 0.1], 0.5, 1e-10);
//! assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-6);
//! assert!(weights.iter().all(|w| *w >= 0.0));
//! ```

pub mod affinity;
pub mod batch;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod routing;
pub mod segmenter;
pub mod stubs;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use affinity::{AffinitySnapshot, PerformanceMatrix, TaskAffinityMap};
pub use batch::{BatchedFusionScheduler, SchedulerStats};
pub use cache::{CacheMetricsSnapshot, SemanticCache, VersionMarker};
pub use config::{EngineConfig, FusionRequestConfig};
pub use engine::{EngineStats, FusionEngine, FusionEngineBuilder, RequestState};
pub use error::{EngineError, EngineResult};
pub use registry::ExpertRegistry;
pub use routing::SparsegenRouter;
pub use segmenter::ClauseSegmenter;
pub use types::{
    Clause, ClauseOutput, Expert, ExpertId, ExpertSignature, FallbackReason, FusionResult,
    FusionWeights, RoutingLogits, StorageHandle,
};
