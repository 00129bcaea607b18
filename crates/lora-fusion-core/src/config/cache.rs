//! Semantic cache configuration.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

fn default_enabled() -> bool {
    true
}

fn default_similarity_threshold() -> f32 {
    0.95
}

fn default_fingerprint_dim() -> usize {
    256
}

/// Configuration for the semantic result cache.
///
/// Entries are not size-bounded: they leave the cache through near-duplicate
/// replacement, optional TTL expiry, or wholesale invalidation when the
/// expert set or affinity map changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether lookups and stores are performed at all.
    /// Default: true
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Cosine similarity (on [0, 1]) a stored fingerprint must exceed to hit.
    /// Default: 0.95
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Dimension of fingerprints produced by the hashed n-gram embedder.
    /// Default: 256
    #[serde(default = "default_fingerprint_dim")]
    pub fingerprint_dim: usize,

    /// Entry lifetime in seconds. None keeps entries until invalidated.
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            similarity_threshold: default_similarity_threshold(),
            fingerprint_dim: default_fingerprint_dim(),
            ttl_seconds: None,
        }
    }
}

impl CacheConfig {
    /// Validate cache configuration values.
    ///
    /// # Errors
    /// - `EngineError::ConfigError` if similarity_threshold is outside [0, 1] or NaN
    /// - `EngineError::ConfigError` if fingerprint_dim is 0
    /// - `EngineError::ConfigError` if ttl_seconds is Some(0)
    pub fn validate(&self) -> EngineResult<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(EngineError::ConfigError {
                message: format!(
                    "similarity_threshold must be in [0, 1], got {}",
                    self.similarity_threshold
                ),
            });
        }
        if self.fingerprint_dim == 0 {
            return Err(EngineError::ConfigError {
                message: "fingerprint_dim must be > 0".to_string(),
            });
        }
        if self.ttl_seconds == Some(0) {
            return Err(EngineError::ConfigError {
                message: "ttl_seconds must be > 0 when set".to_string(),
            });
        }
        Ok(())
    }
}
