//! Template generation backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{EngineError, EngineResult};
use crate::traits::{GenerationBackend, GenerationInput};
use crate::types::{ExpertId, ExpertSignature};

/// Echoes each clause tagged with the expert set that generated it.
///
/// Output for a fused clause is `"[<signature>] <text>"` and for the base
/// model `"[<base>] <text>"`. Optionally sleeps per batch and fails every
/// batch whose signature contains a given expert.
#[derive(Debug, Default)]
pub struct TemplateGenerationBackend {
    latency: Option<Duration>,
    fail_on: Option<ExpertId>,
    batch_calls: AtomicU64,
    generated: AtomicU64,
    base_calls: AtomicU64,
    batch_log: Mutex<Vec<(ExpertSignature, usize)>>,
}

impl TemplateGenerationBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every batch call.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail any batch whose signature includes `id`.
    #[must_use]
    pub fn failing_on(mut self, id: impl Into<ExpertId>) -> Self {
        self.fail_on = Some(id.into());
        self
    }

    /// Number of `generate_batch` calls so far.
    pub fn batch_calls(&self) -> u64 {
        self.batch_calls.load(Ordering::Relaxed)
    }

    /// Number of clauses generated under adapters.
    pub fn generated(&self) -> u64 {
        self.generated.load(Ordering::Relaxed)
    }

    pub fn base_calls(&self) -> u64 {
        self.base_calls.load(Ordering::Relaxed)
    }

    /// Signature and size of every batch, in dispatch order.
    pub fn batch_log(&self) -> Vec<(ExpertSignature, usize)> {
        self.batch_log.lock().clone()
    }

    fn render(signature: &ExpertSignature, text: &str) -> String {
        format!("[{}] {}", signature, text)
    }
}

#[async_trait]
impl GenerationBackend for TemplateGenerationBackend {
    async fn generate(&self, input: &GenerationInput) -> EngineResult<String> {
        let outputs = self
            .generate_batch(&input.signature, std::slice::from_ref(input))
            .await?;
        outputs.into_iter().next().ok_or_else(|| EngineError::BackendError {
            message: "empty batch output".to_string(),
        })
    }

    async fn generate_batch(
        &self,
        signature: &ExpertSignature,
        inputs: &[GenerationInput],
    ) -> EngineResult<Vec<String>> {
        self.batch_calls.fetch_add(1, Ordering::Relaxed);
        self.batch_log.lock().push((signature.clone(), inputs.len()));
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(id) = &self.fail_on {
            if signature.contains(id) {
                return Err(EngineError::BackendError {
                    message: format!("adapter {} failed to load", id),
                });
            }
        }
        self.generated.fetch_add(inputs.len() as u64, Ordering::Relaxed);
        Ok(inputs
            .iter()
            .map(|input| Self::render(signature, &input.text))
            .collect())
    }

    async fn generate_base(&self, text: &str) -> EngineResult<String> {
        self.base_calls.fetch_add(1, Ordering::Relaxed);
        Ok(Self::render(&ExpertSignature::base(), text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FusionWeights;

    fn input(expert: &str, text: &str) -> GenerationInput {
        let weights = FusionWeights::one_hot(ExpertId::from(expert));
        GenerationInput {
            base_context: String::new(),
            signature: weights.signature(),
            weights,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_outputs_tagged_with_signature() {
        let backend = TemplateGenerationBackend::new();
        let out = backend.generate(&input("math-lora", "2+2")).await.unwrap();
        assert_eq!(out, "[math-lora] 2+2");
        assert_eq!(backend.generate_base("hi").await.unwrap(), "[<base>] hi");
        assert_eq!(backend.batch_calls(), 1);
        assert_eq!(backend.base_calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_injection_by_expert() {
        let backend = TemplateGenerationBackend::new().failing_on("poem-lora");
        assert!(backend.generate(&input("math-lora", "ok")).await.is_ok());
        let err = backend.generate(&input("poem-lora", "no")).await.unwrap_err();
        assert!(matches!(err, EngineError::BackendError { .. }));
        assert_eq!(backend.generated(), 1);
    }
}
