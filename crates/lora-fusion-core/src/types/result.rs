//! Assembled fusion output.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::clause::Clause;
use super::expert::ExpertId;
use super::weights::FusionWeights;

/// Why a clause was generated by the base model instead of a fusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No registered expert matched the clause.
    NoCandidates,
    /// Logits or weights stayed non-finite after sanitization.
    NumericInstability,
}

/// One clause together with its routing decision and generated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseOutput {
    pub clause: Clause,
    pub weights: FusionWeights,
    pub generated: String,
    pub fallback: Option<FallbackReason>,
}

/// Result of one `fuse_and_generate` request.
///
/// `clauses` is in original clause order and `text` is their generated
/// outputs joined in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    pub request_id: Uuid,
    pub clauses: Vec<ClauseOutput>,
    pub text: String,
    pub cache_hit: bool,
    pub completed_at: DateTime<Utc>,
}

impl FusionResult {
    /// Assemble from clause outputs already sorted by ordinal.
    #[must_use]
    pub fn assemble(request_id: Uuid, clauses: Vec<ClauseOutput>, separator: &str) -> Self {
        let text = clauses
            .iter()
            .map(|c| c.generated.as_str())
            .collect::<Vec<_>>()
            .join(separator);
        Self {
            request_id,
            clauses,
            text,
            cache_hit: false,
            completed_at: Utc::now(),
        }
    }

    /// Every expert any clause assigned positive weight to.
    #[must_use]
    pub fn referenced_experts(&self) -> BTreeSet<&ExpertId> {
        self.clauses
            .iter()
            .flat_map(|c| c.weights.support())
            .collect()
    }

    /// Copy of a cached result re-labelled for a new request.
    #[must_use]
    pub fn as_cache_hit(&self, request_id: Uuid) -> Self {
        Self {
            request_id,
            cache_hit: true,
            ..self.clone()
        }
    }
}
