//! Ordinary least squares on a dense design matrix
//!
//! Solved through the SVD so that rank-deficient designs (for example a
//! training pool where every flight carries the same mass) still produce the
//! minimum-norm solution instead of failing.

use nalgebra::{DMatrix, DVector};

/// Relative cut-off for singular values, scaled like numpy's default `rcond`
fn singular_value_cutoff(rows: usize, cols: usize, largest: f64) -> f64 {
    f64::EPSILON * rows.max(cols) as f64 * largest
}

/// Solve `min ||X b - y||` for `b`.
///
/// `rows` holds one design row per sample, each `cols` wide. Returns `None`
/// when the system is empty or the solution is not finite.
pub fn solve(rows: &[f64], cols: usize, targets: &[f64]) -> Option<Vec<f64>> {
    let n = targets.len();
    if n == 0 || cols == 0 || rows.len() != n * cols {
        return None;
    }

    let design = DMatrix::from_row_slice(n, cols, rows);
    let target = DVector::from_column_slice(targets);

    let svd = design.svd(true, true);
    let largest = svd.singular_values.max();
    if !largest.is_finite() {
        return None;
    }
    let eps = singular_value_cutoff(n, cols, largest);

    let beta = svd.solve(&target, eps).ok()?;
    let beta: Vec<f64> = beta.iter().copied().collect();
    beta.iter().all(|b| b.is_finite()).then_some(beta)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9 * (1.0 + a.abs().max(b.abs()))
    }

    #[test]
    fn test_exact_line() {
        // y = 2 + 3x
        let xs = [0.0, 1.0, 2.0, 3.0];
        let rows: Vec<f64> = xs.iter().flat_map(|&x| [1.0, x]).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 + 3.0 * x).collect();
        let beta = solve(&rows, 2, &ys).unwrap();
        assert!(close(beta[0], 2.0), "{:?}", beta);
        assert!(close(beta[1], 3.0), "{:?}", beta);
    }

    #[test]
    fn test_intercept_only_is_mean() {
        let ys = [1.0, 2.0, 6.0];
        let beta = solve(&[1.0, 1.0, 1.0], 1, &ys).unwrap();
        assert!(close(beta[0], 3.0));
    }

    #[test]
    fn test_collinear_columns_use_minimum_norm() {
        // Second column duplicates the intercept; weight is split evenly
        let rows = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let beta = solve(&rows, 2, &[4.0, 4.0, 4.0]).unwrap();
        assert!(close(beta[0], 2.0), "{:?}", beta);
        assert!(close(beta[1], 2.0), "{:?}", beta);
    }

    #[test]
    fn test_empty_system() {
        assert!(solve(&[], 2, &[]).is_none());
        assert!(solve(&[1.0, 2.0], 2, &[1.0, 2.0]).is_none());
    }
}
