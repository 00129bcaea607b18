//! Per-clause routing and generation fan-out.
//!
//! Each stage spawns one task per clause and joins them into ordinal-indexed
//! slots. The first failure returns immediately; dropping the `JoinSet`
//! aborts the remaining tasks, which detaches their scheduler requests.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::affinity::AffinitySnapshot;
use crate::batch::BatchedFusionScheduler;
use crate::error::{EngineError, EngineResult};
use crate::routing::SparsegenRouter;
use crate::traits::{GenerationBackend, GenerationInput, RelevancePredictor};
use crate::types::{Clause, ClauseOutput, Expert, FallbackReason, FusionWeights};

/// A clause with its routing decision, waiting for generation.
#[derive(Debug, Clone)]
pub(crate) struct RoutedClause {
    pub clause: Clause,
    pub weights: FusionWeights,
    pub fallback: Option<FallbackReason>,
}

/// Routing inputs shared by every clause of one request.
pub(crate) struct RoutingContext {
    pub predictor: Arc<dyn RelevancePredictor>,
    pub router: Arc<SparsegenRouter>,
    pub experts: Arc<Vec<Expert>>,
    pub snapshot: Arc<AffinitySnapshot>,
    pub lambda_val: f64,
}

/// Generation inputs shared by every clause of one request.
pub(crate) struct GenerationContext {
    pub scheduler: Arc<BatchedFusionScheduler>,
    pub backend: Arc<dyn GenerationBackend>,
    pub batch_max_size: usize,
    pub batch_max_wait: Duration,
}

// ============================================================================
// ROUTING
// ============================================================================

pub(crate) async fn route_clauses(
    ctx: RoutingContext,
    clauses: Vec<Clause>,
) -> EngineResult<Vec<RoutedClause>> {
    let ctx = Arc::new(ctx);
    let count = clauses.len();
    let mut set = JoinSet::new();
    for (slot, clause) in clauses.into_iter().enumerate() {
        let ctx = Arc::clone(&ctx);
        set.spawn(async move { (slot, route_one(&ctx, clause).await) });
    }
    join_ordered(set, count).await
}

async fn route_one(ctx: &RoutingContext, clause: Clause) -> EngineResult<RoutedClause> {
    let mut logits = ctx.predictor.predict(&clause.text, &ctx.experts).await?;

    let predicted = logits.len();
    logits.retain(|id| ctx.experts.iter().any(|e| &e.id == id));
    if logits.len() < predicted {
        debug!(
            clause = clause.index,
            dropped = predicted - logits.len(),
            "Ignoring logits for inactive or unknown experts"
        );
    }

    match ctx
        .router
        .route_with_snapshot(&clause, &logits, &ctx.snapshot, ctx.lambda_val)
    {
        Ok(outcome) if outcome.weights.is_empty() => {
            let degenerate = EngineError::RoutingDegenerate {
                clause_index: clause.index,
            };
            warn!(clause = clause.index, error = %degenerate, "Falling back to base model");
            Ok(RoutedClause {
                clause,
                weights: FusionWeights::empty(),
                fallback: Some(FallbackReason::NoCandidates),
            })
        }
        Ok(outcome) => {
            debug!(
                clause = clause.index,
                signature = %outcome.weights.signature(),
                dominant = ?outcome.weights.dominant().map(|(id, w)| (id.to_string(), w)),
                sanitized = outcome.sanitized,
                "Routed clause"
            );
            Ok(RoutedClause {
                clause,
                weights: outcome.weights,
                fallback: None,
            })
        }
        Err(e) if e.allows_base_fallback() => {
            warn!(clause = clause.index, error = %e, "Fusion failed, falling back to base model");
            Ok(RoutedClause {
                clause,
                weights: FusionWeights::empty(),
                fallback: Some(FallbackReason::NumericInstability),
            })
        }
        Err(e) => Err(e),
    }
}

// ============================================================================
// GENERATION
// ============================================================================

pub(crate) async fn generate_clauses(
    ctx: GenerationContext,
    request_text: &str,
    routed: Vec<RoutedClause>,
) -> EngineResult<Vec<ClauseOutput>> {
    let ctx = Arc::new(ctx);
    let count = routed.len();
    let mut set = JoinSet::new();
    for (slot, routed) in routed.into_iter().enumerate() {
        let ctx = Arc::clone(&ctx);
        let base_context = request_text
            .get(..routed.clause.start)
            .unwrap_or_default()
            .trim_end()
            .to_string();
        set.spawn(async move { (slot, generate_one(&ctx, base_context, routed).await) });
    }
    join_ordered(set, count).await
}

async fn generate_one(
    ctx: &GenerationContext,
    base_context: String,
    routed: RoutedClause,
) -> EngineResult<ClauseOutput> {
    let RoutedClause {
        clause,
        weights,
        fallback,
    } = routed;

    let generated = if fallback.is_some() || weights.is_empty() {
        ctx.backend.generate_base(&clause.text).await?
    } else {
        let input = GenerationInput {
            base_context,
            signature: weights.signature(),
            weights: weights.clone(),
            text: clause.text.clone(),
        };
        ctx.scheduler
            .submit_with(input, ctx.batch_max_size, ctx.batch_max_wait)
            .await?
    };

    Ok(ClauseOutput {
        clause,
        weights,
        generated,
        fallback,
    })
}

// ============================================================================
// JOIN
// ============================================================================

/// Collect `(slot, result)` pairs into slot order.
async fn join_ordered<T: Send + 'static>(
    mut set: JoinSet<(usize, EngineResult<T>)>,
    count: usize,
) -> EngineResult<Vec<T>> {
    let mut slots: Vec<Option<T>> = (0..count).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        let (slot, result) = joined.map_err(|e| EngineError::InternalError {
            message: format!("clause task failed: {}", e),
        })?;
        match slots.get_mut(slot) {
            Some(entry) => *entry = Some(result?),
            None => {
                return Err(EngineError::InternalError {
                    message: format!("clause slot {} out of range", slot),
                })
            }
        }
    }
    slots
        .into_iter()
        .collect::<Option<Vec<T>>>()
        .ok_or_else(|| EngineError::InternalError {
            message: "clause slot left unfilled".to_string(),
        })
}
