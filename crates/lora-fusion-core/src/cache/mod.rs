//! Semantic result cache.
//!
//! Maps a similarity fingerprint of request text to a previously computed
//! [`FusionResult`](crate::types::FusionResult). Lookups tolerate
//! paraphrase-level repetition: a stored entry is a hit when its fingerprint
//! is similar enough to the query, not only when the text is identical.
//!
//! # Eviction
//!
//! There is no size bound. Entries leave the cache when:
//! 1. A near-duplicate with the same version marker replaces them
//! 2. Their TTL (if configured) expires
//! 3. `invalidate_all` clears everything after a registry or affinity change
//!
//! # Coalescing
//!
//! `get_or_compute` runs at most one computation per near-duplicate bucket.
//! Late arrivals subscribe to the leader's result instead of recomputing.

pub mod manager;
pub mod types;

pub use manager::{CacheMetrics, CacheMetricsSnapshot, CacheSource, CachedResult, SemanticCache};
pub use types::{CacheEntry, Fingerprint, VersionMarker};
