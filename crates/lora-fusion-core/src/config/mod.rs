//! Root configuration for the fusion engine.
//!
//! This module defines `EngineConfig`, the top-level configuration struct
//! that aggregates every subsystem configuration.
//!
//! # Loading Configuration
//!
//! ```rust,ignore
//! use lora_fusion_core::EngineConfig;
//!
//! // Load from file
//! let config = EngineConfig::from_file("fusion.toml")?;
//!
//! // Or use defaults with environment overrides
//! let config = EngineConfig::default().with_env_overrides();
//! ```
//!
//! # TOML Structure
//!
//! ```toml
//! [segmenter]
//! ppl_margin_threshold = 0.5
//!
//! [routing]
//! lambda_val = 0.5
//! fusion_cost_coef = 0.5
//!
//! [cache]
//! similarity_threshold = 0.95
//!
//! [batch]
//! max_batch_size = 32
//! max_wait_ms = 20
//!
//! [request]
//! timeout_ms = 30000
//! ```

mod batch;
mod cache;
mod request;
mod routing;
mod segmenter;

#[cfg(test)]
mod tests;

pub use batch::BatchConfig;
pub use cache::CacheConfig;
pub use request::{FusionRequestConfig, RequestConfig};
pub use routing::{clamp_lambda, RoutingConfig, LAMBDA_MAX};
pub use segmenter::SegmenterConfig;

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

// ============================================================================
// ROOT ENGINE CONFIG
// ============================================================================

/// Root configuration for the fusion engine.
///
/// Load from TOML file or use `Default::default()` for development.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Clause segmentation
    #[serde(default)]
    pub segmenter: SegmenterConfig,

    /// Sparsegen routing and affinity penalty
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Semantic result cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Signature batch scheduler
    #[serde(default)]
    pub batch: BatchConfig,

    /// Per-request defaults
    #[serde(default)]
    pub request: RequestConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// - `EngineError::ConfigError` if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();

        let contents = std::fs::read_to_string(path).map_err(|e| EngineError::ConfigError {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        toml::from_str(&contents).map_err(|e| EngineError::ConfigError {
            message: format!("Failed to parse TOML in '{}': {}", path.display(), e),
        })
    }

    /// Create configuration from a TOML string.
    ///
    /// # Errors
    /// - `EngineError::ConfigError` if TOML parsing fails
    pub fn from_toml_str(toml: &str) -> EngineResult<Self> {
        toml::from_str(toml).map_err(|e| EngineError::ConfigError {
            message: format!("Failed to parse TOML: {}", e),
        })
    }

    /// Serialize configuration to a TOML string.
    ///
    /// # Errors
    /// - `EngineError::ConfigError` if serialization fails
    pub fn to_toml_string(&self) -> EngineResult<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::ConfigError {
            message: format!("Failed to serialize to TOML: {}", e),
        })
    }

    /// Validate all configuration values, returning the first error found.
    ///
    /// # Errors
    /// - `EngineError::ConfigError` prefixed with the failing section
    pub fn validate(&self) -> EngineResult<()> {
        self.segmenter
            .validate()
            .map_err(|e| section_error("segmenter", e))?;
        self.routing
            .validate()
            .map_err(|e| section_error("routing", e))?;
        self.cache.validate().map_err(|e| section_error("cache", e))?;
        self.batch.validate().map_err(|e| section_error("batch", e))?;
        self.request
            .validate()
            .map_err(|e| section_error("request", e))?;
        Ok(())
    }

    /// Apply `FUSION_*` environment variable overrides.
    ///
    /// # Supported Variables
    ///
    /// | Variable | Config Path | Type |
    /// |----------|-------------|------|
    /// | `FUSION_LAMBDA` | `routing.lambda_val` | f64 |
    /// | `FUSION_PPL_MARGIN` | `segmenter.ppl_margin_threshold` | f64 |
    /// | `FUSION_CACHE_ENABLED` | `cache.enabled` | bool |
    /// | `FUSION_CACHE_THRESHOLD` | `cache.similarity_threshold` | f32 |
    /// | `FUSION_BATCH_MAX_SIZE` | `batch.max_batch_size` | usize |
    /// | `FUSION_BATCH_MAX_WAIT_MS` | `batch.max_wait_ms` | u64 |
    /// | `FUSION_REQUEST_TIMEOUT_MS` | `request.timeout_ms` | u64 |
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse::<f64>("FUSION_LAMBDA") {
            self.routing.lambda_val = v;
        }
        if let Some(v) = env_parse::<f64>("FUSION_PPL_MARGIN") {
            self.segmenter.ppl_margin_threshold = v;
        }
        if let Some(v) = env_parse::<bool>("FUSION_CACHE_ENABLED") {
            self.cache.enabled = v;
        }
        if let Some(v) = env_parse::<f32>("FUSION_CACHE_THRESHOLD") {
            self.cache.similarity_threshold = v;
        }
        if let Some(v) = env_parse::<usize>("FUSION_BATCH_MAX_SIZE") {
            self.batch.max_batch_size = v;
        }
        if let Some(v) = env_parse::<u64>("FUSION_BATCH_MAX_WAIT_MS") {
            self.batch.max_wait_ms = v;
        }
        if let Some(v) = env_parse::<u64>("FUSION_REQUEST_TIMEOUT_MS") {
            self.request.timeout_ms = v;
        }
        self
    }

    /// Per-request configuration seeded from this config.
    #[must_use]
    pub fn request_defaults(&self) -> FusionRequestConfig {
        FusionRequestConfig {
            lambda_val: clamp_lambda(self.routing.lambda_val),
            ppl_margin_threshold: self.segmenter.ppl_margin_threshold,
            cache_similarity_threshold: self.cache.similarity_threshold,
            batch_max_size: self.batch.max_batch_size,
            batch_max_wait_ms: self.batch.max_wait_ms,
            timeout_ms: self.request.timeout_ms,
        }
    }
}

fn section_error(section: &str, err: EngineError) -> EngineError {
    let message = match err {
        EngineError::ConfigError { message } => message,
        other => other.to_string(),
    };
    EngineError::ConfigError {
        message: format!("[{}] {}", section, message),
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
