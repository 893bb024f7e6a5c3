//! Terminal output for suite runs and single fits.
//!
//! Formatting lives here so the harness and the estimator stay free of
//! presentation code.

pub mod format;

pub use format::*;
