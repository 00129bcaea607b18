//! Text fingerprinting for the semantic cache.

use crate::error::EngineResult;

/// Produces a similarity fingerprint for a piece of text.
///
/// Vectors are compared by cosine similarity, so scale does not matter, but
/// every call must return the same dimension.
pub trait TextEmbedder: Send + Sync {
    fn dimension(&self) -> usize;

    /// # Errors
    /// - `EngineError::EmbedderError` if the text cannot be embedded
    fn embed(&self, text: &str) -> EngineResult<Vec<f32>>;
}
