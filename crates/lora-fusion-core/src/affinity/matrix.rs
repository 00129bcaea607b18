//! Expert × dataset performance matrix.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::types::ExpertId;

/// Evaluation scores, one row per expert and one column per dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMatrix {
    pub expert_ids: Vec<ExpertId>,
    pub scores: Vec<Vec<f64>>,
}

impl PerformanceMatrix {
    /// Build and validate.
    ///
    /// # Errors
    /// - `EngineError::InvalidPerformanceMatrix` if the matrix is empty,
    ///   row count differs from id count, ids repeat, rows are ragged or
    ///   shorter than 2 datasets, or any score is non-finite
    pub fn new(expert_ids: Vec<ExpertId>, scores: Vec<Vec<f64>>) -> EngineResult<Self> {
        let matrix = Self { expert_ids, scores };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Parse from JSON of the form `{"expert_ids": [...], "scores": [[...]]}`.
    ///
    /// # Errors
    /// - `EngineError::InvalidPerformanceMatrix` on parse or validation failure
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let matrix: Self =
            serde_json::from_str(json).map_err(|e| EngineError::InvalidPerformanceMatrix {
                message: format!("failed to parse JSON: {}", e),
            })?;
        matrix.validate()?;
        Ok(matrix)
    }

    /// # Errors
    /// - `EngineError::IoError` if the file cannot be read
    /// - `EngineError::InvalidPerformanceMatrix` on parse or validation failure
    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// # Errors
    /// See [`PerformanceMatrix::new`].
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |message: String| EngineError::InvalidPerformanceMatrix { message };

        if self.expert_ids.is_empty() {
            return Err(invalid("matrix has no experts".to_string()));
        }
        if self.scores.len() != self.expert_ids.len() {
            return Err(invalid(format!(
                "{} score rows for {} experts",
                self.scores.len(),
                self.expert_ids.len()
            )));
        }

        let mut seen = HashSet::with_capacity(self.expert_ids.len());
        for id in &self.expert_ids {
            if !seen.insert(id) {
                return Err(invalid(format!("expert {} appears twice", id)));
            }
        }

        let width = self.scores[0].len();
        if width < 2 {
            return Err(invalid(format!(
                "need at least 2 datasets for correlation, got {}",
                width
            )));
        }
        for (row, id) in self.scores.iter().zip(&self.expert_ids) {
            if row.len() != width {
                return Err(invalid(format!(
                    "row for {} has {} scores, expected {}",
                    id,
                    row.len(),
                    width
                )));
            }
            if let Some(bad) = row.iter().find(|v| !v.is_finite()) {
                return Err(invalid(format!("row for {} contains {}", id, bad)));
            }
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn num_experts(&self) -> usize {
        self.expert_ids.len()
    }

    #[inline]
    #[must_use]
    pub fn num_datasets(&self) -> usize {
        self.scores.first().map(Vec::len).unwrap_or(0)
    }
}
