//! Context-conditioned perplexity scoring.

use async_trait::async_trait;

use crate::error::EngineResult;

/// Scores how surprising a unit is given the units before it.
///
/// Implementations must be deterministic for fixed inputs; segmentation
/// is only restartable if they are.
///
/// # Errors
///
/// Any error is surfaced by the segmenter as
/// `EngineError::SegmentationError` for the unit being scored.
#[async_trait]
pub trait PerplexityOracle: Send + Sync {
    /// Perplexity of `next_unit` conditioned on `context_units`.
    ///
    /// `context_units` holds every preceding unit of the same request, in
    /// order, and is empty for the first unit. The returned value must be
    /// positive and finite.
    async fn score(&self, context_units: &[&str], next_unit: &str) -> EngineResult<f64>;
}
