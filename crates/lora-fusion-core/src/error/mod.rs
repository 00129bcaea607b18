//! Error types for the fusion engine.
//!
//! One enum covers the whole request path so that callers can match on a
//! single type regardless of which component failed.

mod types;


pub use types::{EngineError, EngineResult};
