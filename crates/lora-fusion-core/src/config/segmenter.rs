//! Clause segmentation configuration.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

fn default_ppl_margin_threshold() -> f64 {
    0.5
}

fn default_max_units() -> usize {
    512
}

fn default_split_on_colon() -> bool {
    true
}

/// Configuration for perplexity-minima clause segmentation.
///
/// A unit is a boundary only when it is a strict local minimum of the
/// perplexity series and both neighbours exceed it by more than
/// `ppl_margin_threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Minimum perplexity drop on both sides of a boundary unit.
    /// Default: 0.5
    #[serde(default = "default_ppl_margin_threshold")]
    pub ppl_margin_threshold: f64,

    /// Upper bound on sentence-like units per request.
    /// Inputs beyond this fail with `SegmentationError`.
    /// Default: 512
    #[serde(default = "default_max_units")]
    pub max_units: usize,

    /// Treat `:` followed by whitespace as a unit terminator.
    /// Default: true
    #[serde(default = "default_split_on_colon")]
    pub split_on_colon: bool,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            ppl_margin_threshold: default_ppl_margin_threshold(),
            max_units: default_max_units(),
            split_on_colon: default_split_on_colon(),
        }
    }
}

impl SegmenterConfig {
    /// Validate segmentation configuration values.
    ///
    /// # Errors
    /// - `EngineError::ConfigError` if ppl_margin_threshold is negative or not finite
    /// - `EngineError::ConfigError` if max_units is 0
    pub fn validate(&self) -> EngineResult<()> {
        if !self.ppl_margin_threshold.is_finite() || self.ppl_margin_threshold < 0.0 {
            return Err(EngineError::ConfigError {
                message: format!(
                    "ppl_margin_threshold must be finite and >= 0, got {}",
                    self.ppl_margin_threshold
                ),
            });
        }
        if self.max_units == 0 {
            return Err(EngineError::ConfigError {
                message: "max_units must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
