//! Per-request lifecycle.
//!
//! ```text
//! SEGMENTING ──> ROUTING ──> GENERATING ──> DONE
//!     │                                      ^
//!     └──────────> CACHE_HIT ────────────────┘
//!
//! any non-terminal state ──> FAILED
//! ```
//!
//! The cache is consulted on entry, before the oracle is called, so a hit
//! leaves `SEGMENTING` directly.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Lifecycle state of one `fuse_and_generate` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Segmenting,
    Routing,
    CacheHit,
    Generating,
    Done,
    Failed,
}

impl RequestState {
    /// Name for logging.
    pub fn phase_name(&self) -> &'static str {
        match self {
            RequestState::Segmenting => "segmenting",
            RequestState::Routing => "routing",
            RequestState::CacheHit => "cache_hit",
            RequestState::Generating => "generating",
            RequestState::Done => "done",
            RequestState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Done | RequestState::Failed)
    }

    /// True if `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: RequestState) -> bool {
        use RequestState::*;
        match (*self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Segmenting, Routing | CacheHit) => true,
            (Routing, Generating) => true,
            (Generating | CacheHit, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phase_name())
    }
}

/// Validates and logs the transitions of one request.
#[derive(Debug)]
pub struct RequestStateMachine {
    request_id: Uuid,
    state: RequestState,
    entered_at: Instant,
    started_at: Instant,
    history: Vec<(RequestState, Duration)>,
}

impl RequestStateMachine {
    #[must_use]
    pub fn new(request_id: Uuid) -> Self {
        let now = Instant::now();
        info!(request_id = %request_id, state = %RequestState::Segmenting, "Request started");
        Self {
            request_id,
            state: RequestState::Segmenting,
            entered_at: now,
            started_at: now,
            history: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// States left so far, with the time spent in each.
    #[must_use]
    pub fn history(&self) -> &[(RequestState, Duration)] {
        &self.history
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Move to `next`.
    ///
    /// # Errors
    /// - `EngineError::InternalError` if the transition is not allowed
    pub fn transition(&mut self, next: RequestState) -> EngineResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(EngineError::InternalError {
                message: format!(
                    "request {}: illegal transition {} -> {}",
                    self.request_id, self.state, next
                ),
            });
        }
        let spent = self.entered_at.elapsed();
        info!(
            request_id = %self.request_id,
            from = %self.state,
            to = %next,
            spent_us = spent.as_micros() as u64,
            "Request state transition"
        );
        self.history.push((self.state, spent));
        self.state = next;
        self.entered_at = Instant::now();
        Ok(())
    }

    /// Move to `FAILED`, logging `cause`. No-op once terminal.
    pub fn fail(&mut self, cause: &EngineError) {
        if self.state.is_terminal() {
            return;
        }
        error!(
            request_id = %self.request_id,
            state = %self.state,
            error = %cause,
            "Request failed"
        );
        self.history.push((self.state, self.entered_at.elapsed()));
        self.state = RequestState::Failed;
        self.entered_at = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_path() {
        let mut sm = RequestStateMachine::new(Uuid::new_v4());
        sm.transition(RequestState::Routing).unwrap();
        sm.transition(RequestState::Generating).unwrap();
        sm.transition(RequestState::Done).unwrap();
        assert_eq!(sm.state(), RequestState::Done);
        let visited: Vec<_> = sm.history().iter().map(|(s, _)| *s).collect();
        assert_eq!(
            visited,
            vec![RequestState::Segmenting, RequestState::Routing, RequestState::Generating]
        );
    }

    #[test]
    fn test_cache_hit_path() {
        let mut sm = RequestStateMachine::new(Uuid::new_v4());
        sm.transition(RequestState::CacheHit).unwrap();
        sm.transition(RequestState::Done).unwrap();
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let mut sm = RequestStateMachine::new(Uuid::new_v4());
        assert!(sm.transition(RequestState::Generating).is_err());
        assert!(sm.transition(RequestState::Done).is_err());
        assert_eq!(sm.state(), RequestState::Segmenting);

        sm.transition(RequestState::Routing).unwrap();
        assert!(sm.transition(RequestState::CacheHit).is_err());
    }

    #[test]
    fn test_failed_reachable_from_any_live_state() {
        for path in [
            vec![],
            vec![RequestState::Routing],
            vec![RequestState::Routing, RequestState::Generating],
            vec![RequestState::CacheHit],
        ] {
            let mut sm = RequestStateMachine::new(Uuid::new_v4());
            for s in path {
                sm.transition(s).unwrap();
            }
            sm.fail(&EngineError::InternalError {
                message: "boom".to_string(),
            });
            assert_eq!(sm.state(), RequestState::Failed);
            assert!(sm.transition(RequestState::Done).is_err());
        }
    }

    #[test]
    fn test_fail_after_done_is_noop() {
        let mut sm = RequestStateMachine::new(Uuid::new_v4());
        sm.transition(RequestState::CacheHit).unwrap();
        sm.transition(RequestState::Done).unwrap();
        sm.fail(&EngineError::InternalError {
            message: "late".to_string(),
        });
        assert_eq!(sm.state(), RequestState::Done);
    }
}
