//! Clause segmentation by perplexity minima.
//!
//! 1. Split the text into sentence-like units.
//! 2. Score each unit with the perplexity oracle, conditioned on every
//!    preceding unit of the request.
//! 3. A unit is a boundary when it is a local minimum undercutting both
//!    neighbours by more than the margin threshold.
//! 4. Clauses are the runs of units ending at each boundary (inclusive).

mod core;
mod minima;
mod units;

#[cfg(test)]
mod tests;

pub use self::core::ClauseSegmenter;
pub use minima::{clause_ranges, find_boundaries, PerplexitySeries};
pub use units::{split_units, UnitSpan};
