//! The estimator seam and its output.
//!
//! The harness only needs `Estimator::fit`; everything it compares comes out
//! of `VecmFit`. Scripted estimators in tests implement the same trait.

use nalgebra::DMatrix;
use thiserror::Error;

use crate::domain::{Block, CoefficientBundle, DeterministicTerms, EstimationMethod};
use crate::error::{AppError, exit};

/// Hyperparameters of a single fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitRequest {
    /// Number of lagged differences in the short-run part.
    pub max_diff_lags: usize,
    pub method: EstimationMethod,
    pub deterministic_terms: DeterministicTerms,
    pub coint_rank: usize,
    pub seasons: usize,
    /// Season (0-based) of the first row of the data.
    pub first_season: usize,
}

/// Estimation failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimateError {
    #[error("cointegration rank {rank} is outside 1..={k}")]
    InvalidRank { rank: usize, k: usize },
    #[error("seasonal dummies need at least 2 seasons, got {0}")]
    InvalidSeasons(usize),
    #[error("{nobs} observations are not enough (need more than {needed})")]
    InsufficientData { nobs: usize, needed: usize },
    #[error("{0} is singular")]
    Singular(&'static str),
    #[error("least squares failed for {0}")]
    LeastSquares(&'static str),
    #[error("data contains non-finite values")]
    NonFinite,
}

impl From<EstimateError> for AppError {
    fn from(err: EstimateError) -> Self {
        AppError::new(exit::ESTIMATION, err.to_string())
    }
}

/// Fitted VECM.
///
/// Conventions:
/// - `gamma` is `K × (K·p + d)`: lag blocks `Γ_1 … Γ_p` first, then the `d`
///   unrestricted deterministic columns (constant, seasonal dummies).
/// - `beta` is `(K + t) × r` with `t = 1` when a linear trend is restricted to
///   the cointegration space; its top `r × r` block is the identity.
#[derive(Debug, Clone, PartialEq)]
pub struct VecmFit {
    pub gamma: DMatrix<f64>,
    pub alpha: DMatrix<f64>,
    pub beta: DMatrix<f64>,
    pub sigma_u: DMatrix<f64>,
    /// Eigenvalues of the reduced-rank problem, largest first.
    pub eigenvalues: Vec<f64>,
    pub llf: f64,
    /// Observations used after lags.
    pub nobs: usize,
    pub k_ar_diff: usize,
    pub deterministic_terms: DeterministicTerms,
}

impl VecmFit {
    /// Number of endogenous variables.
    pub fn neqs(&self) -> usize {
        self.alpha.nrows()
    }

    /// `Π = α βᵀ`, including the restricted-trend column when present.
    pub fn pi(&self) -> DMatrix<f64> {
        &self.alpha * self.beta.transpose()
    }

    /// Lag coefficients `[Γ_1 … Γ_p]` without deterministic columns.
    pub fn lag_gamma(&self) -> DMatrix<f64> {
        let cols = (self.neqs() * self.k_ar_diff).min(self.gamma.ncols());
        self.gamma.columns(0, cols).clone_owned()
    }

    /// Unrestricted deterministic coefficients (trailing Gamma columns).
    pub fn deterministic_coefs(&self) -> DMatrix<f64> {
        let lag_cols = (self.neqs() * self.k_ar_diff).min(self.gamma.ncols());
        self.gamma
            .columns(lag_cols, self.gamma.ncols() - lag_cols)
            .clone_owned()
    }

    /// Restricted linear-trend coefficients: the last column of `Π` (K × 1).
    pub fn lin_trend(&self) -> Option<DMatrix<f64>> {
        if !self.deterministic_terms.has_linear_trend() {
            return None;
        }
        let pi = self.pi();
        Some(pi.columns(pi.ncols() - 1, 1).clone_owned())
    }

    /// Levels-VAR coefficients `[A_1 … A_{p+1}]` (K × K(p+1)).
    ///
    /// `A_1 = I + Π_y + Γ_1`, `A_i = Γ_i − Γ_{i−1}`, `A_{p+1} = −Γ_p`.
    pub fn var_representation(&self) -> DMatrix<f64> {
        let k = self.neqs();
        let p = self.k_ar_diff;
        let pi = self.pi();
        let pi_y = pi.columns(0, k).clone_owned();
        let gamma_i = |i: usize| self.gamma.columns(i * k, k).clone_owned();

        let mut out = DMatrix::<f64>::zeros(k, k * (p + 1));
        let mut a1 = DMatrix::<f64>::identity(k, k) + pi_y;
        if p > 0 {
            a1 += &gamma_i(0);
        }
        out.columns_mut(0, k).copy_from(&a1);

        for i in 1..p {
            let a = gamma_i(i) - gamma_i(i - 1);
            out.columns_mut(i * k, k).copy_from(&a);
        }
        if p > 0 {
            let last = -gamma_i(p - 1);
            out.columns_mut(p * k, k).copy_from(&last);
        }
        out
    }

    /// The blocks the fitting driver hands to the harness.
    pub fn to_bundle(&self) -> CoefficientBundle {
        let mut bundle = CoefficientBundle::new();
        bundle.insert(Block::Gamma, self.gamma.clone());
        bundle.insert(Block::Alpha, self.alpha.clone());
        bundle.insert(Block::Beta, self.beta.clone());
        bundle.insert(Block::SigmaU, self.sigma_u.clone());
        bundle
    }
}

/// A VECM estimator.
///
/// `endog` holds one row per period and one column per variable.
pub trait Estimator: Sync {
    fn fit(&self, endog: &DMatrix<f64>, request: &FitRequest) -> Result<VecmFit, EstimateError>;
}
