//! Batch scheduling configuration.
//!
//! Controls how clause generation requests sharing an expert signature are
//! grouped before reaching the generation backend.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

fn default_max_batch_size() -> usize {
    32
}

fn default_max_wait_ms() -> u64 {
    20
}

fn default_poll_interval_ms() -> u64 {
    5
}

fn default_max_concurrent_batches() -> usize {
    4
}

fn default_request_buffer_size() -> usize {
    1024
}

/// Configuration for the signature-keyed batch scheduler.
///
/// A signature queue is released to the backend when:
/// - it holds `max_batch_size` requests, OR
/// - its oldest request has waited `max_wait_ms`
///
/// Individual requests may tighten both limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum requests per dispatched batch.
    /// Default: 32
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Maximum time a request waits for batch partners (milliseconds).
    /// Default: 20
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    /// How often the worker checks queues for expired waits (milliseconds).
    /// Default: 5
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum batches in flight at the backend.
    /// Default: 4
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,

    /// Channel capacity for incoming requests.
    /// Default: 1024
    #[serde(default = "default_request_buffer_size")]
    pub request_buffer_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            max_wait_ms: default_max_wait_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            max_concurrent_batches: default_max_concurrent_batches(),
            request_buffer_size: default_request_buffer_size(),
        }
    }
}

impl BatchConfig {
    /// Validate batch configuration values.
    ///
    /// # Errors
    /// - `EngineError::ConfigError` if max_batch_size is 0
    /// - `EngineError::ConfigError` if poll_interval_ms is 0
    /// - `EngineError::ConfigError` if max_concurrent_batches is 0
    /// - `EngineError::ConfigError` if request_buffer_size is 0
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_batch_size == 0 {
            return Err(EngineError::ConfigError {
                message: "max_batch_size must be > 0".to_string(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(EngineError::ConfigError {
                message: "poll_interval_ms must be > 0".to_string(),
            });
        }
        if self.max_concurrent_batches == 0 {
            return Err(EngineError::ConfigError {
                message: "max_concurrent_batches must be > 0".to_string(),
            });
        }
        if self.request_buffer_size == 0 {
            return Err(EngineError::ConfigError {
                message: "request_buffer_size must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
