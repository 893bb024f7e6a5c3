//! Regressor matrices for the reduced-rank regression.
//!
//! For periods `t = p+1 … T-1` (0-based rows of the levels data):
//!
//! - `Z0` row: `Δy_t`
//! - `Z1` row: `y_{t-1}`, then the restricted trend `t` when configured
//! - `Z2` row: `Δy_{t-1} … Δy_{t-p}`, then constant, then seasonal dummies
//!
//! Row `t` falls in season `(first_season + t) mod seasons`. Seasonal dummy
//! `j` (0-based, `seasons - 1` of them) is one in season `j`; the last season
//! is the baseline absorbed by the constant.

use nalgebra::DMatrix;

use crate::domain::DeterministicTerms;
use crate::models::estimator::EstimateError;

#[derive(Debug, Clone)]
pub struct DesignMatrices {
    pub z0: DMatrix<f64>,
    pub z1: DMatrix<f64>,
    pub z2: DMatrix<f64>,
}

impl DesignMatrices {
    /// Effective number of observations.
    pub fn nobs(&self) -> usize {
        self.z0.nrows()
    }
}

/// Build `Z0`, `Z1`, `Z2` from levels data `y` (T × K).
pub fn build_design(
    y: &DMatrix<f64>,
    k_ar_diff: usize,
    terms: DeterministicTerms,
    seasons: usize,
    first_season: usize,
) -> Result<DesignMatrices, EstimateError> {
    if y.iter().any(|v| !v.is_finite()) {
        return Err(EstimateError::NonFinite);
    }
    if terms.has_seasonal() && seasons < 2 {
        return Err(EstimateError::InvalidSeasons(seasons));
    }

    let (t_total, k) = y.shape();
    let p = k_ar_diff;
    let restricted = usize::from(terms.has_linear_trend());
    let unrestricted = terms.unrestricted_columns(seasons);
    let z1_cols = k + restricted;
    let z2_cols = k * p + unrestricted;

    // Need p+1 start-up rows plus more observations than regressors.
    let needed = p + 1 + z1_cols + z2_cols;
    if t_total <= needed {
        return Err(EstimateError::InsufficientData {
            nobs: t_total,
            needed,
        });
    }

    let n = t_total - p - 1;
    let mut z0 = DMatrix::<f64>::zeros(n, k);
    let mut z1 = DMatrix::<f64>::zeros(n, z1_cols);
    let mut z2 = DMatrix::<f64>::zeros(n, z2_cols);

    for s in 0..n {
        let t = p + 1 + s;
        for j in 0..k {
            z0[(s, j)] = y[(t, j)] - y[(t - 1, j)];
            z1[(s, j)] = y[(t - 1, j)];
        }
        if restricted == 1 {
            z1[(s, k)] = t as f64;
        }

        for lag in 1..=p {
            let base = (lag - 1) * k;
            for j in 0..k {
                z2[(s, base + j)] = y[(t - lag, j)] - y[(t - lag - 1, j)];
            }
        }

        let mut col = k * p;
        if terms.has_constant() {
            z2[(s, col)] = 1.0;
            col += 1;
        }
        if terms.has_seasonal() {
            let season = (first_season + t) % seasons;
            for j in 0..seasons - 1 {
                z2[(s, col + j)] = if season == j { 1.0 } else { 0.0 };
            }
        }
    }

    Ok(DesignMatrices { z0, z1, z2 })
}
