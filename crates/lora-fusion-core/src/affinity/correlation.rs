//! Pearson correlation and correlation-to-distance conversion.
//!
//! # All distances are normalized to [0.0, 1.0]

/// Pearson correlation between two equally long score rows.
///
/// A row with zero variance carries no signal and correlates 0.0 with every
/// other row. Output is clamped to [-1.0, 1.0] to absorb rounding.
#[must_use]
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a <= f64::EPSILON || var_b <= f64::EPSILON {
        return 0.0;
    }
    (cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0)
}

/// Pairwise correlation of every row against every other.
///
/// The diagonal is fixed at 1.0, including for constant rows.
#[must_use]
pub fn correlation_matrix(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = rows.len();
    let mut corr = vec![vec![0.0; n]; n];
    for i in 0..n {
        corr[i][i] = 1.0;
        for j in (i + 1)..n {
            let c = pearson(&rows[i], &rows[j]);
            corr[i][j] = c;
            corr[j][i] = c;
        }
    }
    corr
}

/// Map a correlation in [-1, 1] to a distance in [0, 1].
///
/// `(1 - corr) / 2`: perfectly correlated experts sit at 0, anti-correlated
/// at 1. Out-of-range or NaN input is clamped first.
#[inline]
#[must_use]
pub fn correlation_to_distance(corr: f64) -> f64 {
    let corr = if corr.is_nan() { 0.0 } else { corr.clamp(-1.0, 1.0) };
    (1.0 - corr) / 2.0
}

/// Elementwise distance matrix with an exact zero diagonal.
#[must_use]
pub fn distance_matrix(corr: &[Vec<f64>]) -> Vec<Vec<f64>> {
    corr.iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(|(j, &c)| if i == j { 0.0 } else { correlation_to_distance(c) })
                .collect()
        })
        .collect()
}
