//! Collaborator contracts consumed by the fusion engine.
//!
//! The engine never generates text, scores perplexity or predicts relevance
//! itself. It calls these traits through `Arc<dyn ...>` handles injected at
//! construction.
//!
//! # Thread Safety
//!
//! All traits require `Send + Sync` so handles can be shared across the
//! scheduler worker and per-clause tasks.

mod backend;
mod embedder;
mod oracle;
mod predictor;

pub use backend::{GenerationBackend, GenerationInput};
pub use embedder::TextEmbedder;
pub use oracle::PerplexityOracle;
pub use predictor::RelevancePredictor;
