//! In-flight computation slots for single-flight coalescing.

use std::sync::Arc;

use tokio::sync::watch;

use crate::cache::types::{Fingerprint, VersionMarker};
use crate::types::FusionResult;

/// Published state of an in-flight computation.
#[derive(Debug, Clone)]
pub(crate) enum SlotState {
    Pending,
    Ready(Arc<FusionResult>),
    /// Leader failed or was cancelled; waiters must retry.
    Abandoned,
}

/// One outstanding computation, owned by its leader.
#[derive(Debug)]
pub(crate) struct InflightSlot {
    pub id: u64,
    pub epoch: u64,
    pub marker: VersionMarker,
    pub fingerprint: Fingerprint,
    pub tx: watch::Sender<SlotState>,
}

impl InflightSlot {
    pub fn new(id: u64, epoch: u64, marker: VersionMarker, fingerprint: Fingerprint) -> Self {
        let (tx, _rx) = watch::channel(SlotState::Pending);
        Self {
            id,
            epoch,
            marker,
            fingerprint,
            tx,
        }
    }

    pub fn covers(
        &self,
        fingerprint: &Fingerprint,
        marker: &VersionMarker,
        threshold: f32,
    ) -> bool {
        self.marker == *marker && self.fingerprint.matches(fingerprint, threshold)
    }
}

/// Wait until the slot leaves `Pending`.
///
/// A dropped sender without a final value counts as abandoned.
pub(crate) async fn wait_for(mut rx: watch::Receiver<SlotState>) -> SlotState {
    loop {
        {
            let state = rx.borrow_and_update();
            if !matches!(*state, SlotState::Pending) {
                return state.clone();
            }
        }
        if rx.changed().await.is_err() {
            return match &*rx.borrow() {
                SlotState::Ready(result) => SlotState::Ready(Arc::clone(result)),
                _ => SlotState::Abandoned,
            };
        }
    }
}
