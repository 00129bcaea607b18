//! Per-signature pending queue.

use std::collections::VecDeque;

use crate::error::EngineError;
use crate::types::ExpertSignature;

use super::batch::Batch;
use super::request::GenerationRequest;

/// Pending requests sharing one expert signature, oldest first.
///
/// Owned by the scheduler worker alone, so push, flush checks and drains
/// never interleave.
#[derive(Debug)]
pub struct SignatureQueue {
    signature: ExpertSignature,
    requests: VecDeque<GenerationRequest>,
}

impl SignatureQueue {
    #[must_use]
    pub fn new(signature: ExpertSignature) -> Self {
        Self {
            signature,
            requests: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn signature(&self) -> &ExpertSignature {
        &self.signature
    }

    pub fn push(&mut self, request: GenerationRequest) {
        debug_assert_eq!(request.signature(), &self.signature);
        self.requests.push_back(request);
    }

    /// Smallest `max_batch_size` among queued members.
    #[must_use]
    pub fn effective_max_size(&self) -> usize {
        self.requests
            .iter()
            .map(|r| r.max_batch_size)
            .min()
            .unwrap_or(usize::MAX)
    }

    /// True if the queue reached its effective max size or any member has
    /// waited its own `max_wait`.
    ///
    /// Returns false if empty.
    #[must_use]
    pub fn should_flush(&self) -> bool {
        if self.requests.is_empty() {
            return false;
        }
        if self.requests.len() >= self.effective_max_size() {
            return true;
        }
        self.requests.iter().any(GenerationRequest::wait_expired)
    }

    /// Drop requests whose receivers are gone. Returns how many.
    pub fn prune_detached(&mut self) -> usize {
        let before = self.requests.len();
        self.requests.retain(|r| !r.is_detached());
        before - self.requests.len()
    }

    /// Drain the oldest requests, up to the effective max size.
    pub fn drain_batch(&mut self) -> Option<Batch> {
        if self.requests.is_empty() {
            return None;
        }
        let size = self.requests.len().min(self.effective_max_size());
        let mut batch = Batch::new(self.signature.clone());
        for request in self.requests.drain(..size) {
            batch.add(request);
        }
        Some(batch)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Fail every pending request with the same message.
    pub fn cancel_all(&mut self, message: impl Into<String>) -> usize {
        let message = message.into();
        let count = self.requests.len();
        for request in self.requests.drain(..) {
            let _ = request.response_tx.send(Err(EngineError::InternalError {
                message: message.clone(),
            }));
        }
        count
    }
}
