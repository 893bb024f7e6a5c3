//! Johansen maximum-likelihood VECM estimation.
//!
//! Steps (all moment matrices are divided by the effective sample size `n`):
//!
//! 1. Residualise `Z0` and `Z1` on the short-run regressors `Z2` → `R0`, `R1`.
//! 2. `S00 = R0ᵀR0/n`, `S01 = R0ᵀR1/n`, `S11 = R1ᵀR1/n`.
//! 3. With `S11 = L Lᵀ`, take the `r` leading eigenvectors `v` of the symmetric
//!    matrix `L⁻¹ S10 S00⁻¹ S01 L⁻ᵀ`; `β = L⁻ᵀ v`, then normalise so the top
//!    `r × r` block is the identity.
//! 4. `α = S01 β (βᵀ S11 β)⁻¹`.
//! 5. `Γ` (with unrestricted deterministic columns) by least squares of
//!    `Z0 − Z1 β αᵀ` on `Z2`; `Σ_u` from those residuals.

use std::f64::consts::PI;

use log::debug;
use nalgebra::{Cholesky, DMatrix, SymmetricEigen};

use crate::domain::EstimationMethod;
use crate::math::{residualize, solve_least_squares};
use crate::models::design::build_design;
use crate::models::estimator::{EstimateError, Estimator, FitRequest, VecmFit};

/// Reduced-rank regression estimator.
#[derive(Debug, Clone, Copy, Default)]
pub struct JohansenVecm;

impl Estimator for JohansenVecm {
    fn fit(&self, endog: &DMatrix<f64>, request: &FitRequest) -> Result<VecmFit, EstimateError> {
        match request.method {
            EstimationMethod::Ml => estimate_ml(endog, request),
        }
    }
}

fn estimate_ml(y: &DMatrix<f64>, request: &FitRequest) -> Result<VecmFit, EstimateError> {
    let k = y.ncols();
    let rank = request.coint_rank;
    if rank == 0 || rank > k {
        return Err(EstimateError::InvalidRank { rank, k });
    }

    let design = build_design(
        y,
        request.max_diff_lags,
        request.deterministic_terms,
        request.seasons,
        request.first_season,
    )?;
    let n = design.nobs() as f64;

    let r0 = residualize(&design.z0, &design.z2).ok_or(EstimateError::LeastSquares("Z0 on Z2"))?;
    let r1 = residualize(&design.z1, &design.z2).ok_or(EstimateError::LeastSquares("Z1 on Z2"))?;

    let s00 = r0.transpose() * &r0 / n;
    let s01 = r0.transpose() * &r1 / n;
    let s11 = r1.transpose() * &r1 / n;
    let s10 = s01.transpose();

    let s00_inv = s00.clone().try_inverse().ok_or(EstimateError::Singular("S00"))?;
    let chol = Cholesky::new(s11.clone()).ok_or(EstimateError::Singular("S11"))?;
    let l_inv = chol.l().try_inverse().ok_or(EstimateError::Singular("S11"))?;

    let m = &l_inv * &s10 * &s00_inv * &s01 * l_inv.transpose();
    let m = (&m + m.transpose()) * 0.5;
    let eig = SymmetricEigen::new(m);

    let mut order: Vec<usize> = (0..eig.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| {
        eig.eigenvalues[b]
            .partial_cmp(&eig.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let eigenvalues: Vec<f64> = order.iter().map(|&i| eig.eigenvalues[i]).collect();

    let mut v = DMatrix::<f64>::zeros(eig.eigenvectors.nrows(), rank);
    for (j, &idx) in order.iter().take(rank).enumerate() {
        v.column_mut(j).copy_from(&eig.eigenvectors.column(idx));
    }

    let beta_raw = l_inv.transpose() * v;
    let head_inv = beta_raw
        .rows(0, rank)
        .clone_owned()
        .try_inverse()
        .ok_or(EstimateError::Singular("beta normalisation block"))?;
    let beta = beta_raw * head_inv;

    let bsb_inv = (beta.transpose() * &s11 * &beta)
        .try_inverse()
        .ok_or(EstimateError::Singular("beta' S11 beta"))?;
    let alpha = &s01 * &beta * bsb_inv;

    let lhs = &design.z0 - &design.z1 * &beta * alpha.transpose();
    let gamma_t = solve_least_squares(&design.z2, &lhs).ok_or(EstimateError::LeastSquares("Gamma"))?;
    let resid = &lhs - &design.z2 * &gamma_t;
    let sigma_u = resid.transpose() * &resid / n;

    let llf = log_likelihood(&s00, &eigenvalues[..rank], n, k);

    debug!(
        "johansen fit: terms='{}' p={} r={} nobs={} eigenvalues={:?}",
        request.deterministic_terms,
        request.max_diff_lags,
        rank,
        design.nobs(),
        eigenvalues
    );

    Ok(VecmFit {
        gamma: gamma_t.transpose(),
        alpha,
        beta,
        sigma_u,
        eigenvalues,
        llf,
        nobs: design.nobs(),
        k_ar_diff: request.max_diff_lags,
        deterministic_terms: request.deterministic_terms,
    })
}

/// Concentrated Gaussian log-likelihood at the ML estimate.
fn log_likelihood(s00: &DMatrix<f64>, leading: &[f64], n: f64, k: usize) -> f64 {
    let k = k as f64;
    let log_det = s00.determinant().ln();
    let log_eig: f64 = leading.iter().map(|l| (1.0 - l).ln()).sum();
    -0.5 * n * (k * (2.0 * PI).ln() + log_det + log_eig + k)
}
