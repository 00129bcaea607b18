//! Deterministic collaborator implementations.
//!
//! These stand in for a real base model, adapter bank and embedding model.
//! They drive the CLI and the test-suite: every output is a pure function
//! of the input text, so segmentation, routing and caching behave the same
//! across runs.

mod backend;
mod embedder;
mod lexicon;
mod oracle;
mod predictor;

pub use backend::TemplateGenerationBackend;
pub use embedder::HashedNgramEmbedder;
pub use lexicon::{classify, domain_scores, tokenize, DOMAINS};
pub use oracle::KeywordPerplexityOracle;
pub use predictor::KeywordRelevancePredictor;
