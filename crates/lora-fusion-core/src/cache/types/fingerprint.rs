//! Semantic fingerprints and version markers.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::xxh64;

/// Unit-normalized embedding of a text plus an exact content hash.
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    vector: Vec<f32>,
    text_hash: u64,
}

impl Fingerprint {
    /// Normalize `vector` and hash `text` with xxHash64.
    ///
    /// A zero vector stays zero and is only ever similar to an identical
    /// text.
    #[must_use]
    pub fn new(text: &str, mut vector: Vec<f32>) -> Self {
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for x in &mut vector {
                *x /= norm;
            }
        }
        Self {
            vector,
            text_hash: xxh64(text.as_bytes(), 0),
        }
    }

    #[must_use]
    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    #[inline]
    #[must_use]
    pub fn text_hash(&self) -> u64 {
        self.text_hash
    }

    /// Similarity on [0, 1].
    ///
    /// Identical text is 1.0. Otherwise cosine similarity with negative
    /// values clamped to 0.0; mismatched dimensions are 0.0.
    #[must_use]
    pub fn similarity(&self, other: &Fingerprint) -> f32 {
        if self.text_hash == other.text_hash {
            return 1.0;
        }
        if self.vector.len() != other.vector.len() || self.vector.is_empty() {
            return 0.0;
        }
        let dot: f32 = self
            .vector
            .iter()
            .zip(&other.vector)
            .map(|(a, b)| a * b)
            .sum();
        dot.clamp(0.0, 1.0)
    }

    /// True when `other` falls in the same near-duplicate bucket.
    #[inline]
    #[must_use]
    pub fn matches(&self, other: &Fingerprint, threshold: f32) -> bool {
        self.text_hash == other.text_hash || self.similarity(other) > threshold
    }
}

/// State an entry was computed under.
///
/// Entries only ever match lookups carrying an equal marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionMarker {
    pub registry_generation: u64,
    pub affinity_generation: u64,
    /// Digest of the request knobs that change fusion output.
    pub knob_digest: u64,
}

impl VersionMarker {
    /// True when `current` carries a newer registry or affinity generation.
    ///
    /// Generations only grow, so a superseded marker can never match again.
    #[inline]
    #[must_use]
    pub fn is_superseded_by(&self, current: &VersionMarker) -> bool {
        self.registry_generation < current.registry_generation
            || self.affinity_generation < current.affinity_generation
    }
}
