//! Assembled batch sharing one expert signature.

use std::time::Instant;

use tokio::sync::oneshot;
use tracing::warn;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::traits::GenerationInput;
use crate::types::ExpertSignature;

use super::request::GenerationRequest;

/// Requests with identical support, dispatched as one backend call.
///
/// # Lifecycle
///
/// 1. Drained from a [`SignatureQueue`](super::SignatureQueue)
/// 2. Detached members pruned
/// 3. Inputs handed to the backend
/// 4. Outputs distributed with `complete()` or `fail()`
#[derive(Debug)]
pub struct Batch {
    pub id: Uuid,
    pub signature: ExpertSignature,
    pub inputs: Vec<GenerationInput>,
    /// Response channels, same order as inputs.
    pub response_txs: Vec<oneshot::Sender<EngineResult<String>>>,
    pub request_ids: Vec<Uuid>,
    pub assembled_at: Instant,
}

impl Batch {
    #[must_use]
    pub fn new(signature: ExpertSignature) -> Self {
        Self {
            id: Uuid::new_v4(),
            signature,
            inputs: Vec::new(),
            response_txs: Vec::new(),
            request_ids: Vec::new(),
            assembled_at: Instant::now(),
        }
    }

    /// Add a request. Its signature must equal the batch signature.
    pub fn add(&mut self, request: GenerationRequest) {
        debug_assert_eq!(request.input.signature, self.signature);
        self.request_ids.push(request.id);
        self.inputs.push(request.input);
        self.response_txs.push(request.response_tx);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Remove members whose callers have gone away. Returns how many.
    pub fn prune_detached(&mut self) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while i < self.response_txs.len() {
            if self.response_txs[i].is_closed() {
                self.response_txs.swap_remove(i);
                self.inputs.swap_remove(i);
                self.request_ids.swap_remove(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
        removed
    }

    /// Deliver one output per member, in input order.
    ///
    /// A length mismatch fails the whole batch. Returns the number of
    /// members that were still listening.
    pub fn complete(self, outputs: Vec<String>) -> usize {
        if outputs.len() != self.response_txs.len() {
            let message = format!(
                "backend returned {} outputs for {} inputs",
                outputs.len(),
                self.response_txs.len()
            );
            self.fail(message);
            return 0;
        }

        let mut delivered = 0;
        for (tx, output) in self.response_txs.into_iter().zip(outputs) {
            if tx.send(Ok(output)).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Deliver the same shared failure to every member.
    pub fn fail(self, message: impl Into<String>) {
        let message = message.into();
        let batch_size = self.response_txs.len();
        warn!(batch_id = %self.id, batch_size, reason = %message, "Failing batch");
        for tx in self.response_txs {
            let _ = tx.send(Err(EngineError::BatchDispatchError {
                batch_id: self.id,
                batch_size,
                message: message.clone(),
                shared: true,
            }));
        }
    }
}
