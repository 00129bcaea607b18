//! Request orchestration.
//!
//! [`FusionEngine`] ties the components together:
//!
//! ```text
//! text ─► SemanticCache ─┬─ hit ───────────────────────────────────────────► FusionResult
//!                        └─ miss ─► ClauseSegmenter ─► per-clause route ─►
//!                                   BatchedFusionScheduler / base model ─► ordered join ─► FusionResult
//! ```
//!
//! Routing and generation fan out one task per clause; results land in
//! ordinal-indexed slots and are joined only once every slot is filled.

mod builder;
mod core;
mod pipeline;
mod state;
mod stats;

#[cfg(test)]
mod tests;

pub use self::core::FusionEngine;
pub use builder::FusionEngineBuilder;
pub use state::{RequestState, RequestStateMachine};
pub use stats::EngineStats;
