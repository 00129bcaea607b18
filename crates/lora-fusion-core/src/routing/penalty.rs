//! Task-affinity fusion-cost penalty.

use crate::affinity::AffinitySnapshot;
use crate::types::{ExpertId, RoutingLogits};

/// Subtract each candidate's mean fusion cost to the top-logit candidates.
///
/// The reference set is the `top_k` candidates by raw logit. A candidate in
/// that set is compared against the others in it; a candidate outside it
/// against all of them. Returns adjusted logits in candidate order.
#[must_use]
pub fn apply_affinity_penalty(
    logits: &RoutingLogits,
    affinity: &AffinitySnapshot,
    coef: f64,
    top_k: usize,
) -> Vec<f64> {
    let raw = logits.values();
    if coef == 0.0 || raw.len() < 2 || top_k == 0 {
        return raw;
    }

    let ids: Vec<&ExpertId> = logits.ids().collect();
    let mut ranked: Vec<usize> = (0..raw.len()).collect();
    ranked.sort_by(|&a, &b| raw[b].total_cmp(&raw[a]));
    ranked.truncate(top_k);

    raw.iter()
        .enumerate()
        .map(|(i, &logit)| {
            let costs: Vec<f64> = ranked
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| affinity.fusion_cost(ids[i], ids[j]))
                .collect();
            if costs.is_empty() {
                return logit;
            }
            let mean = costs.iter().sum::<f64>() / costs.len() as f64;
            logit - coef * mean
        })
        .collect()
}
