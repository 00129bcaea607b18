//! Tests for ClauseSegmenter against scripted oracles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::*;
use crate::config::SegmenterConfig;
use crate::error::{EngineError, EngineResult};
use crate::traits::PerplexityOracle;

/// Returns a fixed score per unit position.
struct ScriptedOracle {
    scores: Vec<f64>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    fn new(scores: Vec<f64>) -> Arc<Self> {
        Arc::new(Self {
            scores,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PerplexityOracle for ScriptedOracle {
    async fn score(&self, context_units: &[&str], _next_unit: &str) -> EngineResult<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scores
            .get(context_units.len())
            .copied()
            .ok_or_else(|| EngineError::InternalError {
                message: "script exhausted".to_string(),
            })
    }
}

/// Fails on a chosen unit.
struct FailingOracle {
    fail_at: usize,
}

#[async_trait]
impl PerplexityOracle for FailingOracle {
    async fn score(&self, context_units: &[&str], _next_unit: &str) -> EngineResult<f64> {
        if context_units.len() == self.fail_at {
            return Err(EngineError::InternalError {
                message: "oracle offline".to_string(),
            });
        }
        Ok(10.0)
    }
}

fn segmenter(oracle: Arc<dyn PerplexityOracle>) -> ClauseSegmenter {
    ClauseSegmenter::new(oracle, SegmenterConfig::default())
}

const EIGHT_UNITS: &str = "One. Two. Three. Four. Five. Six. Seven. Eight.";

#[tokio::test]
async fn test_reference_series_yields_three_clauses() {
    let oracle = ScriptedOracle::new(vec![12.5, 15.3, 8.2, 18.7, 11.4, 6.8, 14.2, 19.5]);
    let clauses = segmenter(oracle.clone()).segment(EIGHT_UNITS).await.unwrap();

    let texts: Vec<&str> = clauses.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["One. Two. Three.", "Four. Five. Six.", "Seven. Eight."]
    );
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 8);

    for (i, clause) in clauses.iter().enumerate() {
        assert_eq!(clause.index, i);
        assert_eq!(&EIGHT_UNITS[clause.start..clause.end], clause.text);
    }
}

#[tokio::test]
async fn test_empty_text_yields_no_clauses() {
    let oracle = ScriptedOracle::new(vec![]);
    let clauses = segmenter(oracle.clone()).segment("   ").await.unwrap();
    assert!(clauses.is_empty());
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_single_unit_skips_oracle() {
    let oracle = ScriptedOracle::new(vec![]);
    let clauses = segmenter(oracle.clone())
        .segment("  just one sentence  ")
        .await
        .unwrap();
    assert_eq!(clauses.len(), 1);
    assert_eq!(clauses[0].text, "just one sentence");
    assert_eq!(clauses[0].start, 2);
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_no_boundaries_returns_whole_input() {
    let oracle = ScriptedOracle::new(vec![5.0, 6.0, 7.0]);
    let text = "First. Second. Third.";
    let clauses = segmenter(oracle).segment(text).await.unwrap();
    assert_eq!(clauses.len(), 1);
    assert_eq!(clauses[0].text, text);
}

#[tokio::test]
async fn test_threshold_override() {
    let text = "First. Second. Third.";
    let seg = segmenter(ScriptedOracle::new(vec![10.0, 9.0, 10.0]));

    assert_eq!(seg.segment_with_threshold(text, 0.5).await.unwrap().len(), 2);
    assert_eq!(seg.segment_with_threshold(text, 2.0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_oracle_failure_fails_segmentation() {
    let seg = segmenter(Arc::new(FailingOracle { fail_at: 2 }));
    let err = seg.segment("A. B. C. D.").await.unwrap_err();

    match err {
        EngineError::SegmentationError { unit_index, message } => {
            assert_eq!(unit_index, Some(2));
            assert!(message.contains("oracle offline"));
        }
        other => panic!("expected SegmentationError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_score_fails_segmentation() {
    let seg = segmenter(ScriptedOracle::new(vec![4.0, f64::NAN, 3.0]));
    let err = seg.segment("A. B. C.").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::SegmentationError {
            unit_index: Some(1),
            ..
        }
    ));

    let seg = segmenter(ScriptedOracle::new(vec![4.0, 0.0, 3.0]));
    assert!(seg.segment("A. B. C.").await.is_err());
}

#[tokio::test]
async fn test_unit_cap_enforced() {
    let config = SegmenterConfig {
        max_units: 2,
        ..SegmenterConfig::default()
    };
    let seg = ClauseSegmenter::new(ScriptedOracle::new(vec![1.0; 3]), config);
    let err = seg.segment("A. B. C.").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::SegmentationError {
            unit_index: None,
            ..
        }
    ));
}

#[tokio::test]
async fn test_segmentation_is_deterministic() {
    let oracle = ScriptedOracle::new(vec![12.5, 15.3, 8.2, 18.7, 11.4, 6.8, 14.2, 19.5]);
    let seg = segmenter(oracle);
    let first = seg.segment(EIGHT_UNITS).await.unwrap();
    let second = seg.segment(EIGHT_UNITS).await.unwrap();
    assert_eq!(first, second);
}
