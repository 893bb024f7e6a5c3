//! VECM estimation.
//!
//! `Estimator` is the seam the fitting driver calls; `JohansenVecm` is the
//! maximum-likelihood implementation built on the regressor matrices from
//! `design`.

pub mod design;
pub mod estimator;
pub mod johansen;

pub use estimator::*;
pub use johansen::JohansenVecm;
