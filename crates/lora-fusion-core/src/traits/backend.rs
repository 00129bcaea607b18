//! Text generation under an active expert set.

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::types::{ExpertSignature, FusionWeights};

/// One clause handed to the generation backend.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationInput {
    /// Request text preceding the clause.
    pub base_context: String,
    /// Support of `weights`.
    pub signature: ExpertSignature,
    pub weights: FusionWeights,
    /// Clause text to generate from.
    pub text: String,
}

/// Generation collaborator.
///
/// # Batching
///
/// The scheduler only calls [`generate_batch`](Self::generate_batch) with
/// inputs that share `signature` exactly. Backends with a grouped kernel
/// override it; the default runs `generate` per input.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate for a single fused clause.
    async fn generate(&self, input: &GenerationInput) -> EngineResult<String>;

    /// Generate for every input, returning outputs in input order.
    ///
    /// # Errors
    /// An error fails the whole batch; the scheduler delivers it to every
    /// member as a shared `BatchDispatchError`.
    async fn generate_batch(
        &self,
        signature: &ExpertSignature,
        inputs: &[GenerationInput],
    ) -> EngineResult<Vec<String>> {
        let _ = signature;
        let mut outputs = Vec::with_capacity(inputs.len());
        for input in inputs {
            outputs.push(self.generate(input).await?);
        }
        Ok(outputs)
    }

    /// Generate with the unmodified base model.
    async fn generate_base(&self, text: &str) -> EngineResult<String>;
}
