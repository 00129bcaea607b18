//! SparsegenRouter: logits + affinity penalty → sparse fusion weights.

use tracing::{debug, warn};

use crate::affinity::{AffinitySnapshot, TaskAffinityMap};
use crate::config::{clamp_lambda, RoutingConfig};
use crate::error::{EngineError, EngineResult};
use crate::types::{Clause, ExpertId, FusionWeights, RoutingLogits};

use super::penalty::apply_affinity_penalty;
use super::sparsegen::sparsegen_project;

/// Tolerance on the weight sum.
const SUM_TOLERANCE: f64 = 1e-6;

/// Routing decision with its intermediate values.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome {
    pub weights: FusionWeights,
    /// Candidate logits after the affinity penalty, in candidate order.
    pub adjusted: Vec<(ExpertId, f64)>,
    /// True if the logits had to be sanitized before projecting.
    pub sanitized: bool,
}

/// Maps a clause's relevance logits to sparse fusion weights.
#[derive(Debug, Clone, Default)]
pub struct SparsegenRouter {
    config: RoutingConfig,
}

impl SparsegenRouter {
    #[must_use]
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Route one clause.
    ///
    /// Empty `logits` yield empty weights; the caller falls back to the base
    /// model.
    ///
    /// # Errors
    /// - `EngineError::FusionError` if the projection stays invalid after
    ///   one sanitized retry
    pub fn route(
        &self,
        clause: &Clause,
        logits: &RoutingLogits,
        affinity: &TaskAffinityMap,
        lambda_val: f64,
    ) -> EngineResult<FusionWeights> {
        let snapshot = affinity.snapshot();
        self.route_with_snapshot(clause, logits, &snapshot, lambda_val)
            .map(|outcome| outcome.weights)
    }

    /// Route against a pinned affinity snapshot, returning intermediates.
    ///
    /// # Errors
    /// See [`SparsegenRouter::route`].
    pub fn route_with_snapshot(
        &self,
        clause: &Clause,
        logits: &RoutingLogits,
        affinity: &AffinitySnapshot,
        lambda_val: f64,
    ) -> EngineResult<RouteOutcome> {
        if logits.is_empty() {
            debug!(clause = clause.index, "No routing candidates");
            return Ok(RouteOutcome {
                weights: FusionWeights::empty(),
                adjusted: Vec::new(),
                sanitized: false,
            });
        }

        let lambda_val = clamp_lambda(lambda_val);
        match self.project(logits, affinity, lambda_val) {
            Ok((weights, adjusted)) => Ok(RouteOutcome {
                weights,
                adjusted,
                sanitized: false,
            }),
            Err(EngineError::NumericInstability { message }) => {
                warn!(
                    clause = clause.index,
                    reason = %message,
                    "Sanitizing routing logits and retrying"
                );
                let sanitized = self.sanitize(logits);
                let (weights, adjusted) = self
                    .project(&sanitized, affinity, lambda_val)
                    .map_err(|e| EngineError::FusionError {
                        message: format!("clause {}: {}", clause.index, e),
                    })?;
                Ok(RouteOutcome {
                    weights,
                    adjusted,
                    sanitized: true,
                })
            }
            Err(other) => Err(other),
        }
    }

    fn project(
        &self,
        logits: &RoutingLogits,
        affinity: &AffinitySnapshot,
        lambda_val: f64,
    ) -> EngineResult<(FusionWeights, Vec<(ExpertId, f64)>)> {
        if logits.has_non_finite() {
            return Err(EngineError::NumericInstability {
                message: "non-finite logits".to_string(),
            });
        }

        let adjusted = apply_affinity_penalty(
            logits,
            affinity,
            self.config.fusion_cost_coef,
            self.config.penalty_top_k,
        );
        if adjusted.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::NumericInstability {
                message: "non-finite adjusted logits".to_string(),
            });
        }

        let dense = sparsegen_project(&adjusted, lambda_val, self.config.renorm_epsilon);
        let total: f64 = dense.iter().sum();
        if dense.iter().any(|w| !w.is_finite() || *w < 0.0) || (total - 1.0).abs() > SUM_TOLERANCE
        {
            return Err(EngineError::NumericInstability {
                message: format!("projected weights sum to {}", total),
            });
        }

        let ids: Vec<ExpertId> = logits.ids().cloned().collect();
        let weights = FusionWeights::from_dense(&ids, &dense)?;
        let adjusted = ids.into_iter().zip(adjusted).collect();
        Ok((weights, adjusted))
    }

    /// Replace NaN with the lowest finite logit, map infinities to the clamp
    /// bound, and clamp everything into `[-logit_clamp, logit_clamp]`.
    #[must_use]
    pub fn sanitize(&self, logits: &RoutingLogits) -> RoutingLogits {
        let bound = self.config.logit_clamp;
        let lowest = logits
            .iter()
            .map(|(_, v)| v)
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
            .unwrap_or(-bound)
            .clamp(-bound, bound);

        let mut clean = RoutingLogits::new();
        for (id, v) in logits.iter() {
            let value = if v.is_nan() {
                lowest
            } else if v == f64::INFINITY {
                bound
            } else if v == f64::NEG_INFINITY {
                -bound
            } else {
                v.clamp(-bound, bound)
            };
            clean.insert(id.clone(), value);
        }
        clean
    }
}
