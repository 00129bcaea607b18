//! Per-request knobs and their engine-wide defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::xxh64;

use crate::error::{EngineError, EngineResult};

use super::routing::clamp_lambda;
use super::EngineConfig;

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_output_separator() -> String {
    " ".to_string()
}

/// Engine-wide request handling defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Deadline applied to every `fuse_and_generate` call (milliseconds).
    /// Default: 30000
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Inserted between clause outputs when assembling the final text.
    /// Default: " "
    #[serde(default = "default_output_separator")]
    pub output_separator: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            output_separator: default_output_separator(),
        }
    }
}

impl RequestConfig {
    /// Validate request configuration values.
    ///
    /// # Errors
    /// - `EngineError::ConfigError` if timeout_ms is 0
    pub fn validate(&self) -> EngineResult<()> {
        if self.timeout_ms == 0 {
            return Err(EngineError::ConfigError {
                message: "timeout_ms must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Knobs recognized by a single `fuse_and_generate` call.
///
/// # Example
///
/// ```rust,ignore
/// let config = FusionRequestConfig::default()
///     .with_lambda(0.9)
///     .with_batch_max_wait_ms(5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionRequestConfig {
    /// Sparsity control, clamped to [0.0, 0.99] before use.
    pub lambda_val: f64,
    /// Segmentation sensitivity.
    pub ppl_margin_threshold: f64,
    /// Cache strictness on the [0, 1] similarity scale.
    pub cache_similarity_threshold: f32,
    /// Upper bound on batch size for this request's clauses.
    pub batch_max_size: usize,
    /// Upper bound on batch wait for this request's clauses (milliseconds).
    pub batch_max_wait_ms: u64,
    /// Whole-request deadline (milliseconds).
    pub timeout_ms: u64,
}

impl Default for FusionRequestConfig {
    fn default() -> Self {
        EngineConfig::default().request_defaults()
    }
}

impl FusionRequestConfig {
    #[must_use]
    pub fn with_lambda(mut self, lambda_val: f64) -> Self {
        self.lambda_val = lambda_val;
        self
    }

    #[must_use]
    pub fn with_ppl_margin_threshold(mut self, threshold: f64) -> Self {
        self.ppl_margin_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_cache_similarity_threshold(mut self, threshold: f32) -> Self {
        self.cache_similarity_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_batch_max_size(mut self, size: usize) -> Self {
        self.batch_max_size = size;
        self
    }

    #[must_use]
    pub fn with_batch_max_wait_ms(mut self, wait_ms: u64) -> Self {
        self.batch_max_wait_ms = wait_ms;
        self
    }

    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Validate and clamp into a usable configuration.
    ///
    /// `lambda_val` is clamped into [0.0, 0.99]; NaN is rejected.
    ///
    /// # Errors
    /// - `EngineError::ConfigError` for NaN lambda, negative or non-finite
    ///   margin, similarity outside [0, 1], zero batch size, or zero timeout
    pub fn normalized(mut self) -> EngineResult<Self> {
        if self.lambda_val.is_nan() {
            return Err(EngineError::ConfigError {
                message: "lambda_val must not be NaN".to_string(),
            });
        }
        self.lambda_val = clamp_lambda(self.lambda_val);

        if !self.ppl_margin_threshold.is_finite() || self.ppl_margin_threshold < 0.0 {
            return Err(EngineError::ConfigError {
                message: format!(
                    "ppl_margin_threshold must be finite and >= 0, got {}",
                    self.ppl_margin_threshold
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.cache_similarity_threshold) {
            return Err(EngineError::ConfigError {
                message: format!(
                    "cache_similarity_threshold must be in [0, 1], got {}",
                    self.cache_similarity_threshold
                ),
            });
        }
        if self.batch_max_size == 0 {
            return Err(EngineError::ConfigError {
                message: "batch_max_size must be > 0".to_string(),
            });
        }
        if self.timeout_ms == 0 {
            return Err(EngineError::ConfigError {
                message: "timeout_ms must be > 0".to_string(),
            });
        }
        Ok(self)
    }

    /// Batch wait as a `Duration`.
    #[inline]
    #[must_use]
    pub fn batch_max_wait(&self) -> Duration {
        Duration::from_millis(self.batch_max_wait_ms)
    }

    /// Request deadline as a `Duration`.
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Digest of the knobs that change fusion output.
    ///
    /// Batching and timeout knobs are excluded: they change latency, not
    /// the result.
    #[must_use]
    pub fn output_digest(&self) -> u64 {
        let mut bytes = Vec::with_capacity(16);
        bytes.extend_from_slice(&self.lambda_val.to_bits().to_le_bytes());
        bytes.extend_from_slice(&self.ppl_margin_threshold.to_bits().to_le_bytes());
        xxh64(&bytes, 0)
    }
}
