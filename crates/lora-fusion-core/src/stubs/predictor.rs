//! Keyword relevance predictor.

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::traits::RelevancePredictor;
use crate::types::{Expert, RoutingLogits};

use super::lexicon::{domain_scores, tokenize};

/// Logit per point of keyword evidence.
const LOGIT_SCALE: f64 = 0.5;

/// Emits a logit for each expert whose domain or tags the clause mentions.
///
/// Experts with no evidence are left out, so a clause that matches nothing
/// produces empty logits and falls back to the base model.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordRelevancePredictor;

impl KeywordRelevancePredictor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn evidence(expert: &Expert, tokens: &[String], scores: &[(&str, u32)]) -> u32 {
        let lexicon = scores
            .iter()
            .find(|(domain, _)| *domain == expert.domain)
            .map_or(0, |(_, score)| *score);
        let named = tokens.iter().filter(|t| **t == expert.domain).count() as u32 * 2;
        let tagged = tokens.iter().filter(|t| expert.has_tag(t)).count() as u32;
        lexicon.max(named) + tagged
    }
}

#[async_trait]
impl RelevancePredictor for KeywordRelevancePredictor {
    async fn predict(&self, clause_text: &str, experts: &[Expert]) -> EngineResult<RoutingLogits> {
        let tokens = tokenize(clause_text);
        let scores = domain_scores(clause_text);
        let mut logits = RoutingLogits::new();
        for expert in experts {
            let evidence = Self::evidence(expert, &tokens, &scores);
            if evidence > 0 {
                logits.insert(expert.id.clone(), f64::from(evidence) * LOGIT_SCALE);
            }
        }
        Ok(logits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExpertId, StorageHandle};

    fn expert(id: &str, domain: &str, tags: &[&str]) -> Expert {
        Expert::new(id, domain, tags.iter().copied(), StorageHandle::new(format!("mem://{}", id)))
    }

    #[tokio::test]
    async fn test_only_matching_experts_get_logits() {
        let experts = vec![
            expert("math-lora", "math", &[]),
            expert("poem-lora", "creative", &["poem"]),
            expert("legal-lora", "legal", &["contract"]),
        ];
        let predictor = KeywordRelevancePredictor::new();

        let logits = predictor.predict("Solve: what is 15% of 200?", &experts).await.unwrap();
        assert_eq!(logits.len(), 1);
        assert!(logits.contains(&ExpertId::from("math-lora")));

        let logits = predictor.predict("Write a poem.", &experts).await.unwrap();
        // lexicon 3 + tag 1
        assert_eq!(logits.get(&ExpertId::from("poem-lora")), Some(2.0));

        let logits = predictor.predict("Review this legal contract.", &experts).await.unwrap();
        assert_eq!(logits.get(&ExpertId::from("legal-lora")), Some(1.5));

        let logits = predictor.predict("Hello there.", &experts).await.unwrap();
        assert!(logits.is_empty());
    }
}
