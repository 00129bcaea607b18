//! Core error types for the fusion pipeline.

use thiserror::Error;
use uuid::Uuid;

/// Comprehensive error type for all fusion pipeline failures.
///
/// # Error Categories
///
/// | Category | Variants | Recovery Strategy |
/// |----------|----------|-------------------|
/// | Segmentation | SegmentationError | Fail request, caller may resubmit |
/// | Routing | RoutingDegenerate, NumericInstability, FusionError | Base-model fallback for the clause |
/// | Scheduling | BatchDispatchError, Timeout | Fail request, caller may resubmit |
/// | Registry | ExpertNotFound, ExpertAlreadyRegistered, InvalidPerformanceMatrix | Fix registration data |
/// | Collaborators | PredictorError, BackendError, EmbedderError | Propagate |
/// | Infrastructure | CacheError, IoError, InternalError | Propagate |
/// | Configuration | ConfigError | Fix configuration |
///
/// `CacheMiss` is deliberately absent: a miss is a normal lookup outcome.
#[derive(Debug, Error)]
pub enum EngineError {
    // === Segmentation Errors ===
    /// Perplexity oracle failure or malformed input.
    #[error("Segmentation failed{}: {message}", unit_suffix(.unit_index))]
    SegmentationError {
        unit_index: Option<usize>,
        message: String,
    },

    // === Routing Errors ===
    /// No registered expert matched the clause.
    #[error("Routing produced no candidates for clause {clause_index}")]
    RoutingDegenerate { clause_index: usize },

    /// Non-finite values in logits or weights.
    #[error("Numeric instability: {message}")]
    NumericInstability { message: String },

    /// Fusion weight computation failed after sanitization.
    #[error("Fusion error: {message}")]
    FusionError { message: String },

    // === Scheduling Errors ===
    /// A suspension point exceeded the request deadline.
    #[error("Timeout in {stage} after {timeout_ms}ms")]
    Timeout { stage: &'static str, timeout_ms: u64 },

    /// The generation backend failed a whole batch.
    ///
    /// `shared` is true when every member received the same failure and none
    /// of them is individually responsible.
    #[error("Batch {batch_id} ({batch_size} requests) dispatch failed: {message}")]
    BatchDispatchError {
        batch_id: Uuid,
        batch_size: usize,
        message: String,
        shared: bool,
    },

    // === Registry Errors ===
    /// Expert id unknown to the registry.
    #[error("Expert not found: {id}")]
    ExpertNotFound { id: String },

    /// Expert id already registered and active.
    #[error("Expert already registered: {id}")]
    ExpertAlreadyRegistered { id: String },

    /// Performance matrix shape or contents invalid.
    #[error("Invalid performance matrix: {message}")]
    InvalidPerformanceMatrix { message: String },

    // === Collaborator Errors ===
    /// Relevance predictor failed.
    #[error("Relevance predictor error: {message}")]
    PredictorError { message: String },

    /// Generation backend failed for a single request.
    #[error("Generation backend error: {message}")]
    BackendError { message: String },

    /// Text embedder failed to produce a fingerprint.
    #[error("Embedder error: {message}")]
    EmbedderError { message: String },

    // === Infrastructure Errors ===
    /// Semantic cache operation failed.
    #[error("Cache error: {message}")]
    CacheError { message: String },

    /// File I/O error (config files, performance matrices).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {message}")]
    InternalError { message: String },

    // === Configuration Errors ===
    /// Configuration invalid or missing required fields.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

fn unit_suffix(unit_index: &Option<usize>) -> String {
    match unit_index {
        Some(i) => format!(" at unit {}", i),
        None => String::new(),
    }
}

impl EngineError {
    /// Shorthand for a segmentation failure tied to one unit.
    pub fn segmentation_at(unit_index: usize, message: impl Into<String>) -> Self {
        Self::SegmentationError {
            unit_index: Some(unit_index),
            message: message.into(),
        }
    }

    /// True for deadline expiry at any suspension point.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// True when the error was delivered to every member of a batch.
    #[must_use]
    pub fn is_shared_batch_failure(&self) -> bool {
        matches!(self, Self::BatchDispatchError { shared: true, .. })
    }

    /// True when the clause can recover by generating with the base model.
    #[must_use]
    pub fn allows_base_fallback(&self) -> bool {
        matches!(
            self,
            Self::RoutingDegenerate { .. }
                | Self::NumericInstability { .. }
                | Self::FusionError { .. }
        )
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
