//! Feature-hashed character n-gram embedder.

use xxhash_rust::xxh64::xxh64;

use crate::error::EngineResult;
use crate::traits::TextEmbedder;

pub const DEFAULT_DIMENSION: usize = 256;
const NGRAM: usize = 3;
const NGRAM_SEED: u64 = 0x6e67;
const WORD_SEED: u64 = 0x776f;

/// Embeds text as hashed character trigram and word counts.
///
/// Text is lowercased and stripped of punctuation first, so
/// "Solve for x." and "solve for x" embed identically.
#[derive(Debug, Clone)]
pub struct HashedNgramEmbedder {
    dimension: usize,
}

impl HashedNgramEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Lowercase, map punctuation to spaces and collapse whitespace.
    #[must_use]
    pub fn normalize(text: &str) -> String {
        text.chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '%' {
                    c.to_ascii_lowercase()
                } else {
                    ' '
                }
            })
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn bucket(&self, bytes: &[u8], seed: u64) -> usize {
        (xxh64(bytes, seed) % self.dimension as u64) as usize
    }
}

impl Default for HashedNgramEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl TextEmbedder for HashedNgramEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        let normalized = Self::normalize(text);
        let mut vector = vec![0.0f32; self.dimension];
        if normalized.is_empty() {
            return Ok(vector);
        }

        let padded: Vec<char> = format!(" {} ", normalized).chars().collect();
        let mut buf = [0u8; 4 * NGRAM];
        for window in padded.windows(NGRAM) {
            let mut len = 0;
            for c in window {
                len += c.encode_utf8(&mut buf[len..]).len();
            }
            vector[self.bucket(&buf[..len], NGRAM_SEED)] += 1.0;
        }
        for word in normalized.split(' ') {
            vector[self.bucket(word.as_bytes(), WORD_SEED)] += 1.0;
        }
        Ok(vector)
    }
}
