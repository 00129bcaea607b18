//! Domain types shared across the fusion pipeline.
//!
//! - [`Expert`] / [`ExpertId`]: registered adapter metadata
//! - [`Clause`]: a contiguous span of the request text
//! - [`RoutingLogits`] / [`FusionWeights`]: routing input and output
//! - [`ExpertSignature`]: canonical support-set identity
//! - [`FusionResult`]: the assembled per-request output

mod clause;
mod expert;
mod result;
mod signature;
mod weights;

pub use clause::Clause;
pub use expert::{Expert, ExpertId, StorageHandle};
pub use result::{ClauseOutput, FallbackReason, FusionResult};
pub use signature::ExpertSignature;
pub use weights::{FusionWeights, RoutingLogits};
