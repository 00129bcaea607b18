//! Keyword-driven perplexity oracle.

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::traits::PerplexityOracle;

use super::lexicon::classify;

/// Perplexity with no preceding context.
pub const BASELINE_PPL: f64 = 10.0;
/// Same domain as the most recent domain-bearing context unit.
pub const CONTINUATION_PPL: f64 = 4.0;
/// Domain changed from the context.
pub const SHIFT_PPL: f64 = 16.0;
/// Domain of either side unknown.
pub const NEUTRAL_PPL: f64 = 8.0;

/// Scores a unit low when it continues the context's domain and high when
/// it switches domain.
///
/// A unit that closes a topic gets low perplexity and the unit after it
/// gets high perplexity, so perplexity minima land on topic boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordPerplexityOracle;

impl KeywordPerplexityOracle {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PerplexityOracle for KeywordPerplexityOracle {
    async fn score(&self, context_units: &[&str], next_unit: &str) -> EngineResult<f64> {
        if context_units.is_empty() {
            return Ok(BASELINE_PPL);
        }
        let context_domain = context_units.iter().rev().find_map(|u| classify(u));
        let ppl = match (context_domain, classify(next_unit)) {
            (Some(prev), Some(next)) if prev == next => CONTINUATION_PPL,
            (Some(_), Some(_)) => SHIFT_PPL,
            _ => NEUTRAL_PPL,
        };
        Ok(ppl)
    }
}
