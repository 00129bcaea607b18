//! Clause type produced by segmentation.

use serde::{Deserialize, Serialize};

/// A contiguous span of the original request text.
///
/// `start`/`end` are byte offsets into the original input such that
/// `&input[start..end] == text`. `index` is the clause ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Clause {
    #[must_use]
    pub fn new(index: usize, start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            start,
            end,
            text: text.into(),
        }
    }

    /// Span length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}
