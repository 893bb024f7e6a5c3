//! Multivariate least squares.
//!
//! The estimator repeatedly solves small regressions of the form
//!
//! ```text
//! minimize ‖Y - X B‖²_F
//! ```
//!
//! with several right-hand sides at once (one per equation of the system).
//!
//! Implementation choices:
//! - SVD solve, so tall design matrices work (nalgebra's `QR::solve` is meant
//!   for square systems).
//! - Singular values below a threshold relative to the largest one are
//!   treated as zero.
//! - An empty design (no regressors) yields an empty coefficient matrix and
//!   leaves `Y` unchanged when residualising.

use nalgebra::DMatrix;

/// Relative cut-off for singular values.
const RCOND: f64 = 1e-12;

/// Solve `X B ≈ Y` for `B` (`X.ncols() × Y.ncols()`).
///
/// Returns `None` if the solution is not finite or the shapes disagree.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if x.nrows() != y.nrows() {
        return None;
    }
    if x.ncols() == 0 {
        return Some(DMatrix::zeros(0, y.ncols()));
    }

    let svd = x.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    if !(max_sv.is_finite() && max_sv > 0.0) {
        return None;
    }
    let eps = max_sv * RCOND * x.nrows().max(x.ncols()) as f64;

    let b = svd.solve(y, eps).ok()?;
    if b.iter().all(|v| v.is_finite()) {
        Some(b)
    } else {
        None
    }
}

/// Residuals of `Y` after regressing on `X`.
pub fn residualize(y: &DMatrix<f64>, x: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if x.ncols() == 0 {
        return Some(y.clone());
    }
    let b = solve_least_squares(x, y)?;
    Some(y - x * b)
}
