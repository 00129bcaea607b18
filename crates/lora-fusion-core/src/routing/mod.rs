//! Sparse expert routing.
//!
//! Relevance logits are first penalized by task-affinity cost, then
//! projected onto the probability simplex with Sparsegen so that weak
//! candidates drop to exactly zero.
//!
//! # Sparsity
//!
//! | lambda | Behavior |
//! |--------|----------|
//! | 0.0 | Sparsemax, broadest support |
//! | 0.5 | Default |
//! | 0.99 | Near one-hot |

mod penalty;
mod router;
mod sparsegen;


pub use penalty::apply_affinity_penalty;
pub use router::{RouteOutcome, SparsegenRouter};
pub use sparsegen::sparsegen_project;
