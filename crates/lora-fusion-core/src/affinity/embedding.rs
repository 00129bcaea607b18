//! 2-D distance embedding: classical MDS seed refined by SMACOF.
//!
//! Both stages are deterministic for a fixed distance matrix.

/// Jacobi sweep budget.
const JACOBI_MAX_SWEEPS: usize = 64;

/// Jacobi stops once the off-diagonal mass falls below this fraction of the
/// total squared mass.
const JACOBI_TOLERANCE: f64 = 1e-24;

/// SMACOF iteration budget.
pub const SMACOF_MAX_ITERATIONS: usize = 300;

/// SMACOF stops when stress improves by less than this.
pub const SMACOF_TOLERANCE: f64 = 1e-9;

/// Result of embedding a distance matrix into the plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding2D {
    pub positions: Vec<[f64; 2]>,
    /// Raw stress: sum over pairs of (embedded - target)^2.
    pub stress: f64,
    pub iterations: usize,
}

/// Embed `dist` into 2-D.
///
/// `dist` must be square and symmetric with a zero diagonal.
#[must_use]
pub fn embed_2d(dist: &[Vec<f64>]) -> Embedding2D {
    let seed = classical_mds(dist);
    smacof(dist, seed, SMACOF_MAX_ITERATIONS, SMACOF_TOLERANCE)
}

/// Classical (Torgerson) scaling to two dimensions.
///
/// Double-centers the squared distances and takes the eigenvectors of the
/// two largest eigenvalues. Negative eigenvalues contribute a zero coordinate.
#[must_use]
pub fn classical_mds(dist: &[Vec<f64>]) -> Vec<[f64; 2]> {
    let n = dist.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![[0.0, 0.0]];
    }

    // B = -1/2 * J * D^2 * J
    let sq: Vec<Vec<f64>> = dist
        .iter()
        .map(|row| row.iter().map(|d| d * d).collect())
        .collect();
    let row_means: Vec<f64> = sq.iter().map(|r| r.iter().sum::<f64>() / n as f64).collect();
    let grand_mean = row_means.iter().sum::<f64>() / n as f64;
    let mut b = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            b[i][j] = -0.5 * (sq[i][j] - row_means[i] - row_means[j] + grand_mean);
        }
    }

    let (values, vectors) = jacobi_eigen(b);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &c| values[c].total_cmp(&values[a]).then(a.cmp(&c)));

    let mut coords = vec![[0.0; 2]; n];
    for (axis, &k) in order.iter().take(2).enumerate() {
        let scale = values[k].max(0.0).sqrt();
        for (i, point) in coords.iter_mut().enumerate() {
            point[axis] = vectors[i][k] * scale;
        }
    }
    coords
}

/// Cyclic Jacobi eigendecomposition of a symmetric matrix.
///
/// Returns the eigenvalues and a matrix whose column `k` is the unit
/// eigenvector for eigenvalue `k`.
fn jacobi_eigen(mut a: Vec<Vec<f64>>) -> (Vec<f64>, Vec<Vec<f64>>) {
    let n = a.len();
    let mut v: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    let scale: f64 = a.iter().flatten().map(|x| x * x).sum::<f64>().max(f64::MIN_POSITIVE);
    for _ in 0..JACOBI_MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|p| ((p + 1)..n).map(move |q| (p, q)))
            .map(|(p, q)| a[p][q] * a[p][q])
            .sum();
        if off <= JACOBI_TOLERANCE * scale {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[p][q];
                if apq.abs() <= f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * apq);
                let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                let t = sign / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for row in a.iter_mut() {
                    let (akp, akq) = (row[p], row[q]);
                    row[p] = c * akp - s * akq;
                    row[q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[p][k], a[q][k]);
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in v.iter_mut() {
                    let (vkp, vkq) = (row[p], row[q]);
                    row[p] = c * vkp - s * vkq;
                    row[q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let values = (0..n).map(|i| a[i][i]).collect();
    (values, v)
}

#[inline]
fn euclidean(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

/// Raw stress of `positions` against target distances.
#[must_use]
pub fn stress(dist: &[Vec<f64>], positions: &[[f64; 2]]) -> f64 {
    let n = positions.len();
    let mut total = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            total += (euclidean(&positions[i], &positions[j]) - dist[i][j]).powi(2);
        }
    }
    total
}

/// SMACOF stress majorization with unit weights (Guttman transform).
#[must_use]
pub fn smacof(
    dist: &[Vec<f64>],
    init: Vec<[f64; 2]>,
    max_iterations: usize,
    tolerance: f64,
) -> Embedding2D {
    let n = init.len();
    let mut x = init;
    let mut current = stress(dist, &x);
    let mut iterations = 0;

    if n < 2 {
        return Embedding2D {
            positions: x,
            stress: current,
            iterations,
        };
    }

    while iterations < max_iterations {
        iterations += 1;
        let mut next = vec![[0.0; 2]; n];
        for i in 0..n {
            let mut diag = 0.0;
            let mut acc = [0.0; 2];
            for j in 0..n {
                if i == j {
                    continue;
                }
                let d = euclidean(&x[i], &x[j]);
                let bij = if d > f64::EPSILON { -dist[i][j] / d } else { 0.0 };
                diag -= bij;
                acc[0] += bij * x[j][0];
                acc[1] += bij * x[j][1];
            }
            next[i][0] = (diag * x[i][0] + acc[0]) / n as f64;
            next[i][1] = (diag * x[i][1] + acc[1]) / n as f64;
        }

        let next_stress = stress(dist, &next);
        let improvement = current - next_stress;
        x = next;
        current = next_stress;
        if improvement.abs() < tolerance {
            break;
        }
    }

    Embedding2D {
        positions: x,
        stress: current,
        iterations,
    }
}
