//! Perplexity-minima boundary detection.

/// Per-unit perplexity scores, aligned 1:1 with segmentation units.
#[derive(Debug, Clone, PartialEq)]
pub struct PerplexitySeries(Vec<f64>);

impl PerplexitySeries {
    #[must_use]
    pub fn new(scores: Vec<f64>) -> Self {
        Self(scores)
    }

    #[must_use]
    pub fn scores(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn boundaries(&self, threshold: f64) -> Vec<usize> {
        find_boundaries(&self.0, threshold)
    }
}

/// Indices of interior local minima that undercut both neighbours by more
/// than `threshold`.
///
/// The first and last index are never boundaries.
#[must_use]
pub fn find_boundaries(ppls: &[f64], threshold: f64) -> Vec<usize> {
    if ppls.len() < 3 {
        return Vec::new();
    }
    (1..ppls.len() - 1)
        .filter(|&i| {
            let (prev, cur, next) = (ppls[i - 1], ppls[i], ppls[i + 1]);
            cur < prev && cur < next && prev - cur > threshold && next - cur > threshold
        })
        .collect()
}

/// Inclusive unit ranges of each clause.
///
/// A boundary unit closes the clause it belongs to; the next clause starts
/// right after it.
#[must_use]
pub fn clause_ranges(num_units: usize, boundaries: &[usize]) -> Vec<(usize, usize)> {
    if num_units == 0 {
        return Vec::new();
    }
    let mut ranges = Vec::with_capacity(boundaries.len() + 1);
    let mut first = 0;
    for &b in boundaries {
        if b >= first && b + 1 < num_units {
            ranges.push((first, b));
            first = b + 1;
        }
    }
    ranges.push((first, num_units - 1));
    ranges
}
