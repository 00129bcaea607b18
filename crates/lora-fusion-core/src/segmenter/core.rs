//! ClauseSegmenter implementation.

use std::sync::Arc;

use tracing::debug;

use crate::config::SegmenterConfig;
use crate::error::{EngineError, EngineResult};
use crate::traits::PerplexityOracle;
use crate::types::Clause;

use super::minima::{clause_ranges, PerplexitySeries};
use super::units::{split_units, UnitSpan};

/// Splits request text into clauses at perplexity minima.
///
/// Holds no per-request state: every call re-queries the oracle, so a
/// cancelled call can simply be restarted.
pub struct ClauseSegmenter {
    oracle: Arc<dyn PerplexityOracle>,
    config: SegmenterConfig,
}

impl ClauseSegmenter {
    #[must_use]
    pub fn new(oracle: Arc<dyn PerplexityOracle>, config: SegmenterConfig) -> Self {
        Self { oracle, config }
    }

    #[must_use]
    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Segment with the configured margin threshold.
    ///
    /// # Errors
    /// See [`ClauseSegmenter::segment_with_threshold`].
    pub async fn segment(&self, text: &str) -> EngineResult<Vec<Clause>> {
        self.segment_with_threshold(text, self.config.ppl_margin_threshold)
            .await
    }

    /// Segment `text` into ordered, non-overlapping clauses.
    ///
    /// # Errors
    /// - `EngineError::SegmentationError` if the text has more than
    ///   `max_units` units, or the oracle fails or returns a non-positive or
    ///   non-finite score for any unit
    pub async fn segment_with_threshold(
        &self,
        text: &str,
        threshold: f64,
    ) -> EngineResult<Vec<Clause>> {
        let units = split_units(text, self.config.split_on_colon);
        if units.len() > self.config.max_units {
            return Err(EngineError::SegmentationError {
                unit_index: None,
                message: format!(
                    "input has {} units, limit is {}",
                    units.len(),
                    self.config.max_units
                ),
            });
        }

        match units.len() {
            0 => return Ok(Vec::new()),
            1 => return Ok(vec![span_clause(text, 0, &units, 0, 0)]),
            _ => {}
        }

        let series = self.perplexity_series(text, &units).await?;
        let boundaries = series.boundaries(threshold);
        debug!(
            units = units.len(),
            boundaries = ?boundaries,
            "Detected clause boundaries"
        );

        Ok(clause_ranges(units.len(), &boundaries)
            .into_iter()
            .enumerate()
            .map(|(index, (first, last))| span_clause(text, index, &units, first, last))
            .collect())
    }

    /// Score every unit against all preceding units of the same text.
    ///
    /// # Errors
    /// - `EngineError::SegmentationError` tagged with the failing unit
    pub async fn perplexity_series(
        &self,
        text: &str,
        units: &[UnitSpan],
    ) -> EngineResult<PerplexitySeries> {
        let slices: Vec<&str> = units.iter().map(|u| u.slice(text)).collect();
        let mut scores = Vec::with_capacity(slices.len());

        for (i, unit) in slices.iter().enumerate() {
            let score = self
                .oracle
                .score(&slices[..i], unit)
                .await
                .map_err(|e| match e {
                    EngineError::SegmentationError { message, .. } => {
                        EngineError::segmentation_at(i, message)
                    }
                    other => EngineError::segmentation_at(i, other.to_string()),
                })?;

            if !score.is_finite() || score <= 0.0 {
                return Err(EngineError::segmentation_at(
                    i,
                    format!("oracle returned invalid perplexity {}", score),
                ));
            }
            scores.push(score);
        }
        Ok(PerplexitySeries::new(scores))
    }
}

fn span_clause(text: &str, index: usize, units: &[UnitSpan], first: usize, last: usize) -> Clause {
    let start = units[first].start;
    let end = units[last].end;
    Clause::new(index, start, end, &text[start..end])
}
