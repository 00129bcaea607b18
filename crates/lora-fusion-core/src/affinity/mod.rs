//! Task-affinity embedding of experts.
//!
//! Experts whose evaluation scores move together sit close in a 2-D plane;
//! the distance between two positions is the fusion cost the router uses to
//! discourage blending behaviorally dissimilar experts.
//!
//! # Pipeline
//!
//! ```text
//! PerformanceMatrix ─► Pearson corr ─► (1 - corr) / 2 ─► classical MDS ─► SMACOF ─► ArcSwap
//! ```

mod correlation;
mod embedding;
mod map;
mod matrix;


pub use correlation::{correlation_matrix, correlation_to_distance, distance_matrix, pearson};
pub use embedding::{classical_mds, embed_2d, smacof, stress, Embedding2D};
pub use map::{AffinitySnapshot, TaskAffinityMap};
pub use matrix::PerformanceMatrix;
