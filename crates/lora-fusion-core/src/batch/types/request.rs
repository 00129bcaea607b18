//! Individual generation request submitted to the scheduler.

use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::traits::GenerationInput;
use crate::types::ExpertSignature;

/// One clause waiting to be generated under a fused expert set.
///
/// Dropping the receiver returned by [`GenerationRequest::new`] detaches the
/// request; the scheduler prunes it before dispatch.
#[derive(Debug)]
pub struct GenerationRequest {
    pub id: Uuid,
    pub input: GenerationInput,
    /// Largest batch this request will join.
    pub max_batch_size: usize,
    /// Longest this request will wait for co-batching.
    pub max_wait: Duration,
    pub response_tx: oneshot::Sender<EngineResult<String>>,
    pub submitted_at: Instant,
}

impl GenerationRequest {
    #[must_use]
    pub fn new(
        input: GenerationInput,
        max_batch_size: usize,
        max_wait: Duration,
    ) -> (Self, oneshot::Receiver<EngineResult<String>>) {
        let (tx, rx) = oneshot::channel();
        let request = Self {
            id: Uuid::new_v4(),
            input,
            max_batch_size: max_batch_size.max(1),
            max_wait,
            response_tx: tx,
            submitted_at: Instant::now(),
        };
        (request, rx)
    }

    #[inline]
    #[must_use]
    pub fn signature(&self) -> &ExpertSignature {
        &self.input.signature
    }

    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.submitted_at.elapsed()
    }

    /// True once the request has waited its full `max_wait`.
    #[inline]
    #[must_use]
    pub fn wait_expired(&self) -> bool {
        self.elapsed() >= self.max_wait
    }

    /// True if the caller stopped waiting for the result.
    #[inline]
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.response_tx.is_closed()
    }
}
