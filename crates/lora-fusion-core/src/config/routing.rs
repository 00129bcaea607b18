//! Sparsegen routing configuration.
//!
//! Controls the simplex projection that turns per-expert relevance logits
//! into sparse fusion weights, and the task-affinity penalty applied first.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Largest usable sparsity value; `1 - lambda` is a divisor.
pub const LAMBDA_MAX: f64 = 0.99;

fn default_lambda_val() -> f64 {
    0.5
}

fn default_fusion_cost_coef() -> f64 {
    0.5
}

fn default_penalty_top_k() -> usize {
    3
}

fn default_logit_clamp() -> f64 {
    50.0
}

fn default_renorm_epsilon() -> f64 {
    1e-10
}

/// Clamp a sparsity value into `[0.0, LAMBDA_MAX]`.
///
/// NaN maps to 0.0 (dense).
#[inline]
#[must_use]
pub fn clamp_lambda(lambda_val: f64) -> f64 {
    if lambda_val.is_nan() {
        return 0.0;
    }
    lambda_val.clamp(0.0, LAMBDA_MAX)
}

/// Configuration for expert routing.
///
/// # Sparsity
/// `lambda_val` near 0.99 drives the projection toward one-hot; near 0.0 the
/// support spreads across most candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Default sparsity control, clamped to [0.0, 0.99].
    /// Default: 0.5
    #[serde(default = "default_lambda_val")]
    pub lambda_val: f64,

    /// Scale of the affinity penalty subtracted from raw logits.
    /// Set to 0.0 to route on raw logits.
    /// Default: 0.5
    #[serde(default = "default_fusion_cost_coef")]
    pub fusion_cost_coef: f64,

    /// Number of highest-logit candidates the penalty is averaged over.
    /// Default: 3
    #[serde(default = "default_penalty_top_k")]
    pub penalty_top_k: usize,

    /// Absolute bound applied to logits during sanitization.
    /// Default: 50.0
    #[serde(default = "default_logit_clamp")]
    pub logit_clamp: f64,

    /// Guard added to the renormalization denominator.
    /// Default: 1e-10
    #[serde(default = "default_renorm_epsilon")]
    pub renorm_epsilon: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            lambda_val: default_lambda_val(),
            fusion_cost_coef: default_fusion_cost_coef(),
            penalty_top_k: default_penalty_top_k(),
            logit_clamp: default_logit_clamp(),
            renorm_epsilon: default_renorm_epsilon(),
        }
    }
}

impl RoutingConfig {
    /// Validate routing configuration values.
    ///
    /// `lambda_val` outside [0, 0.99] is accepted here and clamped at use;
    /// only NaN is rejected.
    ///
    /// # Errors
    /// Returns `EngineError::ConfigError` if:
    /// - lambda_val is NaN
    /// - fusion_cost_coef < 0 or not finite
    /// - penalty_top_k == 0
    /// - logit_clamp <= 0 or not finite
    /// - renorm_epsilon <= 0 or not finite
    pub fn validate(&self) -> EngineResult<()> {
        if self.lambda_val.is_nan() {
            return Err(EngineError::ConfigError {
                message: "lambda_val must not be NaN".to_string(),
            });
        }
        if !self.fusion_cost_coef.is_finite() || self.fusion_cost_coef < 0.0 {
            return Err(EngineError::ConfigError {
                message: "fusion_cost_coef must be finite and >= 0".to_string(),
            });
        }
        if self.penalty_top_k == 0 {
            return Err(EngineError::ConfigError {
                message: "penalty_top_k must be > 0".to_string(),
            });
        }
        if !self.logit_clamp.is_finite() || self.logit_clamp <= 0.0 {
            return Err(EngineError::ConfigError {
                message: "logit_clamp must be finite and > 0".to_string(),
            });
        }
        if !self.renorm_epsilon.is_finite() || self.renorm_epsilon <= 0.0 {
            return Err(EngineError::ConfigError {
                message: "renorm_epsilon must be finite and > 0".to_string(),
            });
        }
        Ok(())
    }
}
