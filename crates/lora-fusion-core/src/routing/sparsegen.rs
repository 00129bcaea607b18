//! Sparsegen projection onto the probability simplex.

/// Project scores onto the simplex with tunable sparsity.
///
/// Returns weights in the same order as `scores`. `lambda_val` must already
/// be clamped below 1.0; `epsilon` guards the renormalization denominator.
///
/// # Algorithm
///
/// 1. Sort descending, remembering each score's original index
/// 2. Prefix sums `U[k]` over the sorted scores
/// 3. Support size: largest `k` with `(1 - lambda) + k * u[k-1] > U[k-1]`
/// 4. `tau = (U[k*-1] - 1 + lambda) / k*`
/// 5. `p_sorted[i] = max(0, (u[i] - tau) / (1 - lambda))`
/// 6. Scatter `p[order[i]] = p_sorted[i]` into a fresh array
/// 7. `p / (sum(p) + epsilon)`
///
/// A single score always maps to exactly 1.0.
#[must_use]
pub fn sparsegen_project(scores: &[f64], lambda_val: f64, epsilon: f64) -> Vec<f64> {
    match scores.len() {
        0 => return Vec::new(),
        1 => return vec![1.0],
        _ => {}
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    let sorted: Vec<f64> = order.iter().map(|&i| scores[i]).collect();

    let mut prefix = Vec::with_capacity(sorted.len());
    let mut running = 0.0;
    for &u in &sorted {
        running += u;
        prefix.push(running);
    }

    let mass = 1.0 - lambda_val;
    let mut support = 1;
    for k in 1..=sorted.len() {
        if mass + k as f64 * sorted[k - 1] > prefix[k - 1] {
            support = k;
        }
    }

    let tau = (prefix[support - 1] - 1.0 + lambda_val) / support as f64;

    let mut projected = vec![0.0; scores.len()];
    for (rank, &original) in order.iter().enumerate() {
        projected[original] = ((sorted[rank] - tau) / mass).max(0.0);
    }

    let total: f64 = projected.iter().sum();
    projected.iter().map(|p| p / (total + epsilon)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-10;

    #[test]
    fn test_single_candidate_is_exactly_one() {
        for lambda in [0.0, 0.5, 0.99] {
            assert_eq!(sparsegen_project(&[-3.7], lambda, EPS), vec![1.0]);
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(sparsegen_project(&[], 0.5, EPS).is_empty());
    }

    #[test]
    fn test_all_equal_is_uniform() {
        let p = sparsegen_project(&[2.0, 2.0, 2.0, 2.0], 0.5, EPS);
        for w in &p {
            assert!((w - 0.25).abs() < 1e-6, "weights {:?}", p);
        }
    }

    #[test]
    fn test_dominant_score_goes_one_hot() {
        let p = sparsegen_project(&[0.1, 5.0, 0.3], 0.5, EPS);
        assert_eq!(p[0], 0.0);
        assert_eq!(p[2], 0.0);
        assert!((p[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_scatter_restores_original_order() {
        // Non-monotone input order; the winner must land at index 2
        let p = sparsegen_project(&[0.2, 0.4, 0.9, 0.1], 0.0, EPS);
        let argmax = p
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(argmax, 2);
        assert!(p[1] > p[0]);
        assert!(p[0] >= p[3]);
    }

    #[test]
    fn test_higher_lambda_is_sparser() {
        let scores = [0.5, 0.45, 0.4, 0.35, 0.3];
        let support = |lambda: f64| {
            sparsegen_project(&scores, lambda, EPS)
                .iter()
                .filter(|&&w| w > 0.0)
                .count()
        };
        assert!(support(0.9) <= support(0.5));
        assert!(support(0.5) <= support(0.0));
        assert_eq!(support(0.0), 5);
    }
}
