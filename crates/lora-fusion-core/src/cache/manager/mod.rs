//! Semantic cache manager.

mod core;
mod inflight;
mod metrics;


pub use self::core::{CacheSource, CachedResult, SemanticCache};
pub use metrics::{CacheMetrics, CacheMetricsSnapshot};
