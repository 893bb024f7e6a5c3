//! Write a fit in the reference text layout.
//!
//! The output is what `reference::parse_reference` reads back: one header line
//! per section in table order, followed by rows of fixed-decimal numbers. The
//! preamble never repeats header text so it cannot open a section early.

use std::fs;
use std::path::Path;

use nalgebra::DMatrix;

use crate::domain::{Block, CoefficientBundle, DeterministicTerms};
use crate::error::{AppError, exit};
use crate::io::reference::section_table;
use crate::models::VecmFit;

const DECIMALS: usize = 8;

/// The blocks a reference file carries for one configuration.
///
/// - `Gamma`: lag columns only
/// - `C`: trailing deterministic Gamma columns (when the configuration prints one)
/// - `beta`: `r × K`, one row per cointegration relation, trend row dropped
/// - `lin_trend`: last column of `αβᵀ` (trend configurations only)
pub fn reference_bundle(fit: &VecmFit, terms: DeterministicTerms) -> CoefficientBundle {
    let k = fit.neqs();
    let mut bundle = CoefficientBundle::new();

    bundle.insert(Block::Gamma, fit.lag_gamma());
    if terms.has_deterministic_block() {
        bundle.insert(Block::C, fit.deterministic_coefs());
    }
    bundle.insert(Block::Alpha, fit.alpha.clone());
    bundle.insert(Block::Beta, fit.beta.rows(0, k.min(fit.beta.nrows())).transpose());
    if let Some(trend) = fit.lin_trend() {
        bundle.insert(Block::LinTrend, trend);
    }
    bundle.insert(Block::Var, fit.var_representation());
    bundle.insert(Block::SigmaU, fit.sigma_u.clone());
    bundle
}

/// Render a bundle as reference text. Blocks missing from the bundle are skipped.
pub fn render_reference(bundle: &CoefficientBundle, terms: DeterministicTerms, title: &str) -> String {
    let mut out = String::new();
    for line in title.lines() {
        out.push_str("# ");
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&format!("# configuration: '{}'\n", terms.as_str()));

    for spec in section_table(terms) {
        let Some(matrix) = bundle.get(spec.block) else {
            continue;
        };
        out.push('\n');
        out.push_str(spec.header);
        out.push_str(":\n");
        push_rows(&mut out, matrix);
    }
    out
}

fn push_rows(out: &mut String, matrix: &DMatrix<f64>) {
    for row in matrix.row_iter() {
        for v in row.iter() {
            out.push_str(&format!(" {:.*}", DECIMALS, v));
        }
        out.push('\n');
    }
}

/// Write the reference file for a fit.
pub fn write_reference(
    path: &Path,
    fit: &VecmFit,
    terms: DeterministicTerms,
    title: &str,
) -> Result<(), AppError> {
    let text = render_reference(&reference_bundle(fit, terms), terms, title);
    fs::write(path, text)
        .map_err(|e| AppError::new(exit::INPUT, format!("Failed to write reference file '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::reference::parse_reference;

    fn fit_with(terms: DeterministicTerms) -> VecmFit {
        let trend = terms.has_linear_trend();
        let beta = if trend {
            DMatrix::from_row_slice(3, 1, &[1.0, -0.25, 0.004])
        } else {
            DMatrix::from_row_slice(2, 1, &[1.0, -0.25])
        };
        let det = terms.unrestricted_columns(4);
        let gamma = DMatrix::from_fn(2, 2 + det, |i, j| 0.1 * (i as f64 + 1.0) - 0.03 * j as f64);
        VecmFit {
            gamma,
            alpha: DMatrix::from_row_slice(2, 1, &[-0.12, 0.03]),
            beta,
            sigma_u: DMatrix::from_row_slice(2, 2, &[2e-5, 1e-6, 1e-6, 3e-5]),
            eigenvalues: vec![0.2, 0.01],
            llf: 10.0,
            nobs: 100,
            k_ar_diff: 1,
            deterministic_terms: terms,
        }
    }

    #[test]
    fn bundle_splits_gamma_and_drops_trend_row() {
        let fit = fit_with(DeterministicTerms::ConstantLinearTrend);
        let bundle = reference_bundle(&fit, DeterministicTerms::ConstantLinearTrend);

        assert_eq!(bundle.get(Block::Gamma).unwrap().shape(), (2, 2));
        assert_eq!(bundle.get(Block::C).unwrap().shape(), (2, 1));
        assert_eq!(bundle.get(Block::Beta).unwrap().shape(), (1, 2));
        assert_eq!(bundle.get(Block::LinTrend).unwrap().shape(), (2, 1));
        assert_eq!(bundle.get(Block::Var).unwrap().shape(), (2, 4));
    }

    #[test]
    fn no_deterministic_block_without_constant() {
        let fit = fit_with(DeterministicTerms::None);
        let bundle = reference_bundle(&fit, DeterministicTerms::None);
        assert!(!bundle.contains(Block::C));
        assert!(!bundle.contains(Block::LinTrend));
    }

    #[test]
    fn rendered_text_parses_back() {
        let terms = DeterministicTerms::ConstantLinearTrend;
        let bundle = reference_bundle(&fit_with(terms), terms);
        let text = render_reference(&bundle, terms, "dataset e6\nloading, lagged and linear words");

        let parsed = parse_reference(&text, terms).unwrap();
        // The VAR block is written for completeness but never read back.
        assert!(text.contains("VAR representation:\n"), "{text}");
        assert!(!parsed.contains(Block::Var));
        assert_eq!(parsed.len(), bundle.len() - 1);
        for (block, expected) in bundle.iter().filter(|(block, _)| *block != Block::Var) {
            let got = parsed.get(block).unwrap();
            assert_eq!(got.shape(), expected.shape(), "{block}");
            for (a, b) in got.iter().zip(expected.iter()) {
                assert!((a - b).abs() < 1e-8, "{block}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn rows_have_leading_space_and_fixed_decimals() {
        let mut bundle = CoefficientBundle::new();
        bundle.insert(Block::Gamma, DMatrix::from_row_slice(1, 2, &[-0.5, 2.0]));
        let text = render_reference(&bundle, DeterministicTerms::None, "t");
        assert!(text.contains("Lagged endogenous term:\n -0.50000000 2.00000000\n"), "{text}");
    }
}
