//! Batching of clause generations that share an expert signature.

pub mod scheduler;
pub mod types;


pub use scheduler::{BatchedFusionScheduler, SchedulerStats};
pub use types::{Batch, GenerationRequest, SignatureQueue};
