//! Routing logits and fusion weights.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::expert::ExpertId;
use super::signature::ExpertSignature;

/// Per-expert relevance scores for one clause, in candidate order.
///
/// Expert ids are unique; candidate order is preserved because the routing
/// projection scatters its sorted output back through it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingLogits {
    entries: Vec<(ExpertId, f64)>,
}

impl RoutingLogits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (id, logit) pairs.
    ///
    /// # Errors
    /// - `EngineError::PredictorError` if an expert id appears twice
    pub fn from_pairs<I, T>(pairs: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (T, f64)>,
        T: Into<ExpertId>,
    {
        let mut logits = Self::new();
        for (id, value) in pairs {
            let id = id.into();
            if logits.contains(&id) {
                return Err(EngineError::PredictorError {
                    message: format!("duplicate logit for expert {}", id),
                });
            }
            logits.entries.push((id, value));
        }
        Ok(logits)
    }

    /// Set the logit for an expert, replacing any previous value in place.
    pub fn insert(&mut self, id: impl Into<ExpertId>, value: f64) {
        let id = id.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((id, value)),
        }
    }

    #[must_use]
    pub fn get(&self, id: &ExpertId) -> Option<f64> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, v)| *v)
    }

    #[must_use]
    pub fn contains(&self, id: &ExpertId) -> bool {
        self.entries.iter().any(|(existing, _)| existing == id)
    }

    /// Keep only candidates accepted by the predicate, preserving order.
    pub fn retain(&mut self, mut keep: impl FnMut(&ExpertId) -> bool) {
        self.entries.retain(|(id, _)| keep(id));
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ExpertId, f64)> {
        self.entries.iter().map(|(id, v)| (id, *v))
    }

    pub fn ids(&self) -> impl Iterator<Item = &ExpertId> {
        self.entries.iter().map(|(id, _)| id)
    }

    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    /// True if any logit is NaN or infinite.
    #[must_use]
    pub fn has_non_finite(&self) -> bool {
        self.entries.iter().any(|(_, v)| !v.is_finite())
    }
}

/// Sparse, normalized expert weights for one clause.
///
/// Only strictly positive weights are stored, so the key set is the support.
/// When non-empty the weights sum to 1 within 1e-6.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    weights: BTreeMap<ExpertId, f64>,
}

impl FusionWeights {
    /// Weights for the base-model fallback (empty support).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a dense projection aligned with `ids`, dropping zeros.
    ///
    /// # Errors
    /// - `EngineError::InternalError` if lengths differ
    /// - `EngineError::NumericInstability` if any weight is negative or non-finite
    pub fn from_dense(ids: &[ExpertId], dense: &[f64]) -> EngineResult<Self> {
        if ids.len() != dense.len() {
            return Err(EngineError::InternalError {
                message: format!(
                    "weight vector length {} does not match {} candidates",
                    dense.len(),
                    ids.len()
                ),
            });
        }
        let mut weights = BTreeMap::new();
        for (id, &w) in ids.iter().zip(dense) {
            if !w.is_finite() || w < 0.0 {
                return Err(EngineError::NumericInstability {
                    message: format!("weight for {} is {}", id, w),
                });
            }
            if w > 0.0 {
                weights.insert(id.clone(), w);
            }
        }
        Ok(Self { weights })
    }

    /// Single-expert weights (1.0).
    #[must_use]
    pub fn one_hot(id: ExpertId) -> Self {
        let mut weights = BTreeMap::new();
        weights.insert(id, 1.0);
        Self { weights }
    }

    #[must_use]
    pub fn get(&self, id: &ExpertId) -> f64 {
        self.weights.get(id).copied().unwrap_or(0.0)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ExpertId, f64)> {
        self.weights.iter().map(|(id, w)| (id, *w))
    }

    /// Experts with strictly positive weight, in id order.
    pub fn support(&self) -> impl Iterator<Item = &ExpertId> {
        self.weights.keys()
    }

    /// Canonical grouping key of the support.
    #[must_use]
    pub fn signature(&self) -> ExpertSignature {
        ExpertSignature::from_ids(self.weights.keys().cloned())
    }

    /// Highest-weight expert; ties resolve to the smallest id.
    #[must_use]
    pub fn dominant(&self) -> Option<(&ExpertId, f64)> {
        self.weights
            .iter()
            .fold(None, |best: Option<(&ExpertId, f64)>, (id, &w)| match best {
                Some((_, bw)) if bw >= w => best,
                _ => Some((id, w)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<ExpertId> {
        names.iter().map(|n| ExpertId::from(*n)).collect()
    }

    #[test]
    fn test_logits_reject_duplicates() {
        let result = RoutingLogits::from_pairs([("math", 1.0), ("math", 2.0)]);
        assert!(matches!(result, Err(EngineError::PredictorError { .. })));
    }

    #[test]
    fn test_logits_insert_replaces_in_place() {
        let mut logits = RoutingLogits::from_pairs([("math", 1.0), ("code", 2.0)]).unwrap();
        logits.insert("math", 5.0);
        assert_eq!(logits.len(), 2);
        assert_eq!(logits.ids().next().unwrap().as_str(), "math");
        assert_eq!(logits.get(&"math".into()), Some(5.0));
    }

    #[test]
    fn test_logits_non_finite_detection() {
        let logits = RoutingLogits::from_pairs([("a", 1.0), ("b", f64::NAN)]).unwrap();
        assert!(logits.has_non_finite());
    }

    #[test]
    fn test_weights_drop_zeros() {
        let weights =
            FusionWeights::from_dense(&ids(&["a", "b", "c"]), &[0.0, 0.75, 0.25]).unwrap();
        assert_eq!(weights.len(), 2);
        assert_eq!(weights.get(&"a".into()), 0.0);
        assert_eq!(weights.signature(), ExpertSignature::from_ids(["b", "c"]));
    }

    #[test]
    fn test_weights_reject_negative_and_nan() {
        assert!(FusionWeights::from_dense(&ids(&["a"]), &[-0.1]).is_err());
        assert!(FusionWeights::from_dense(&ids(&["a"]), &[f64::NAN]).is_err());
        assert!(FusionWeights::from_dense(&ids(&["a", "b"]), &[1.0]).is_err());
    }

    #[test]
    fn test_dominant_expert() {
        let weights = FusionWeights::from_dense(&ids(&["a", "b"]), &[0.3, 0.7]).unwrap();
        let (id, w) = weights.dominant().unwrap();
        assert_eq!(id.as_str(), "b");
        assert!((w - 0.7).abs() < 1e-12);
        assert!(FusionWeights::empty().dominant().is_none());
    }
}
