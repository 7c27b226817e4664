//! Linear least squares solver.
//!
//! Every Levenberg–Marquardt step solves a small, tall linear problem of the form:
//!
//! ```text
//! minimize ‖A x − b‖²
//! ```
//!
//! where `A` is the Jacobian stacked on top of the damping rows.
//!
//! Implementation choices:
//! - We use SVD so tall (more rows than columns) and rank-deficient systems are
//!   handled the same way: small singular values are truncated, which yields the
//!   minimum-norm solution.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - The truncation threshold is relative to the largest singular value, because
//!   Jacobian columns of an impedance model differ by many orders of magnitude.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is empty, mis-shaped, or produces non-finite values.
pub fn solve_least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    if a.ncols() == 0 || a.nrows() != b.len() {
        return None;
    }
    if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
        return None;
    }

    let svd = a.clone().svd(true, true);
    let s_max = svd.singular_values.max();
    if !(s_max.is_finite() && s_max > 0.0) {
        return None;
    }

    let tol = s_max * a.nrows().max(a.ncols()) as f64 * f64::EPSILON;
    let x = svd.solve(b, tol).ok()?;
    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn rank_deficient_system_gives_minimum_norm_solution() {
        // Two identical columns: any (a, b) with a + b = 2 fits; minimum norm is (1, 1).
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        let y = DVector::from_row_slice(&[2.0, 2.0, 2.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 1.0).abs() < 1e-10);
        assert!((beta[1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn rejects_non_finite_and_mis_shaped_input() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, f64::NAN]);
        let y = DVector::from_row_slice(&[1.0, 1.0]);
        assert!(solve_least_squares(&x, &y).is_none());

        let x = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let y = DVector::from_row_slice(&[1.0, 1.0, 1.0]);
        assert!(solve_least_squares(&x, &y).is_none());
    }
}
