//! Per-clause expert relevance prediction.

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::types::{Expert, RoutingLogits};

/// Predicts relevance logits for a clause over the registered experts.
///
/// `experts` is the active registry snapshot at routing time. The returned
/// logits may cover any subset of it; experts left out are not candidates.
/// Returning an empty set means no expert matches the clause and the engine
/// falls back to the base model.
#[async_trait]
pub trait RelevancePredictor: Send + Sync {
    async fn predict(&self, clause_text: &str, experts: &[Expert]) -> EngineResult<RoutingLogits>;
}
