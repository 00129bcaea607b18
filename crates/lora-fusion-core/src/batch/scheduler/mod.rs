//! BatchedFusionScheduler: signature-keyed batching over the generation backend.
//!
//! # Architecture
//!
//! ```text
//! submit() ─► request_tx ─► Worker Task
//!                              │
//!                              ▼
//!                 HashMap<ExpertSignature, SignatureQueue>
//!                              │  should_flush()
//!                              ▼
//!                 Semaphore (max_concurrent_batches)
//!                              │
//!                              ▼
//!                 backend.generate_batch(signature, inputs)
//!                              │
//!                              ▼
//!                 batch.complete(outputs) / batch.fail(err)
//! ```

mod core;
mod stats;
mod worker;

pub use self::core::BatchedFusionScheduler;
pub use stats::SchedulerStats;
