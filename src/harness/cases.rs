//! Test-case descriptors: one per (dataset, configuration, block).
//!
//! Alignment between the fitted and the reference layout happens here, when a
//! case is built. Running a case is then a pure check over owned matrices.

use nalgebra::DMatrix;
use serde::Serialize;

use crate::domain::{Block, CoefficientBundle, DatasetId, DeterministicTerms, EstimationMethod, Tolerance};
use crate::harness::compare::{Closeness, allclose};
use crate::harness::context::TestContext;

/// What a case asserts.
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    AllClose {
        actual: DMatrix<f64>,
        desired: DMatrix<f64>,
        tolerance: Tolerance,
    },
    /// A structural condition with no numeric comparison.
    Holds { condition: bool, detail: String },
    /// A block needed for the comparison is missing from one side.
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub dataset: DatasetId,
    pub terms: DeterministicTerms,
    pub block: Block,
    pub method: EstimationMethod,
    pub err_msg: String,
    pub check: Check,
}

/// Result of running one case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseOutcome {
    pub name: String,
    pub dataset: DatasetId,
    pub terms: DeterministicTerms,
    pub block: Block,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TestCase {
    /// `test_ml_Gamma`, `test_ml_lin_trend`, ...
    pub fn name(&self) -> String {
        format!("test_{}_{}", self.method.as_str(), self.block.name())
    }

    pub fn run(&self) -> CaseOutcome {
        let failure = match &self.check {
            Check::AllClose {
                actual,
                desired,
                tolerance,
            } => match allclose(actual, desired, *tolerance) {
                Closeness::Close => None,
                Closeness::ShapeMismatch { actual, desired } => Some(format!(
                    "(shapes ({}, {}), ({}, {}) mismatch)",
                    actual.0, actual.1, desired.0, desired.1
                )),
                Closeness::NotClose(mm) => Some(format!(
                    "Not equal to tolerance rtol={}, atol={}\n\
                     Mismatched elements: {} / {} ({:.3}%)\n\
                     Max absolute difference: {:e}\n\
                     Max relative difference: {:e}",
                    tolerance.rtol,
                    tolerance.atol,
                    mm.mismatched,
                    mm.total,
                    100.0 * mm.mismatched as f64 / mm.total as f64,
                    mm.max_abs,
                    mm.max_rel
                )),
            },
            Check::Holds { condition, detail } => (!condition).then(|| detail.clone()),
            Check::Unavailable { reason } => Some(reason.clone()),
        };

        CaseOutcome {
            name: self.name(),
            dataset: self.dataset.clone(),
            terms: self.terms,
            block: self.block,
            passed: failure.is_none(),
            message: failure.map(|detail| format!("{}\n{}", self.err_msg, detail)),
        }
    }
}

/// Diagnostic header naming the parameter, dataset and configuration.
pub fn build_err_msg(block: Block, dataset: &DatasetId, terms: DeterministicTerms) -> String {
    format!(
        "Error in {} for:\n- Dataset: {}\n- Deterministic terms: {}",
        block.parameter_label(),
        dataset,
        terms.display_name()
    )
}

/// Every case of the suite, block-major.
pub fn build_cases(ctx: &TestContext) -> Vec<TestCase> {
    let mut cases = Vec::with_capacity(Block::COMPARED.len() * ctx.datasets.len() * ctx.terms.len());
    for block in Block::COMPARED {
        for dataset in &ctx.datasets {
            for &terms in &ctx.terms {
                let check = match (ctx.obtained.get(dataset, terms), ctx.desired.get(dataset, terms)) {
                    (Some(obtained), Some(desired)) => {
                        block_check(block, terms, obtained, desired, ctx.tolerance)
                    }
                    (None, _) => unavailable("no fitted results"),
                    (_, None) => unavailable("no reference results"),
                };
                cases.push(TestCase {
                    dataset: dataset.clone(),
                    terms,
                    block,
                    method: ctx.method,
                    err_msg: build_err_msg(block, dataset, terms),
                    check,
                });
            }
        }
    }
    cases
}

/// Build the check for one block from the fitted and reference bundles.
pub fn block_check(
    block: Block,
    terms: DeterministicTerms,
    obtained: &CoefficientBundle,
    desired: &CoefficientBundle,
    tolerance: Tolerance,
) -> Check {
    let sides = Sides { obtained, desired };
    let built = match block {
        Block::Gamma => gamma_check(&sides, tolerance),
        Block::Beta => beta_check(&sides, tolerance),
        Block::C => deterministic_check(&sides, terms, tolerance),
        Block::LinTrend => lin_trend_check(&sides, terms, tolerance),
        Block::Alpha | Block::SigmaU | Block::Var => sides
            .both(block)
            .map(|(a, d)| all_close(a.clone(), d.clone(), tolerance)),
    };
    built.unwrap_or_else(|reason| Check::Unavailable { reason })
}

struct Sides<'a> {
    obtained: &'a CoefficientBundle,
    desired: &'a CoefficientBundle,
}

impl<'a> Sides<'a> {
    fn obtained(&self, block: Block) -> Result<&'a DMatrix<f64>, String> {
        self.obtained
            .get(block)
            .ok_or_else(|| format!("fitted results have no '{block}' block"))
    }

    fn desired(&self, block: Block) -> Result<&'a DMatrix<f64>, String> {
        self.desired
            .get(block)
            .ok_or_else(|| format!("reference results have no '{block}' block"))
    }

    fn both(&self, block: Block) -> Result<(&'a DMatrix<f64>, &'a DMatrix<f64>), String> {
        Ok((self.obtained(block)?, self.desired(block)?))
    }
}

fn all_close(actual: DMatrix<f64>, desired: DMatrix<f64>, tolerance: Tolerance) -> Check {
    Check::AllClose {
        actual,
        desired,
        tolerance,
    }
}

fn unavailable(reason: &str) -> Check {
    Check::Unavailable {
        reason: reason.to_string(),
    }
}

/// Fitted Gamma carries the deterministic columns after the lags; the reference
/// prints those separately.
fn gamma_check(sides: &Sides<'_>, tolerance: Tolerance) -> Result<Check, String> {
    let (gamma, gamma_ref) = sides.both(Block::Gamma)?;
    let cols = gamma.ncols().min(gamma_ref.ncols());
    let actual = if gamma.ncols() > gamma_ref.ncols() {
        gamma.columns(0, cols).clone_owned()
    } else {
        gamma.clone()
    };
    Ok(all_close(actual, gamma_ref.clone(), tolerance))
}

/// The reference prints one relation per row; the fitted beta may also carry a
/// restricted-trend row below the variables.
fn beta_check(sides: &Sides<'_>, tolerance: Tolerance) -> Result<Check, String> {
    let (beta, beta_ref) = sides.both(Block::Beta)?;
    let desired = beta_ref.transpose();
    let actual = if beta.nrows() > desired.nrows() {
        beta.rows(0, desired.nrows()).clone_owned()
    } else {
        beta.clone()
    };
    Ok(all_close(actual, desired, tolerance))
}

/// Rows of the fitted beta that belong to the variables (restricted trend excluded).
fn variable_rows(beta: &DMatrix<f64>, terms: DeterministicTerms) -> usize {
    beta.nrows().saturating_sub(usize::from(terms.has_linear_trend()))
}

fn deterministic_check(
    sides: &Sides<'_>,
    terms: DeterministicTerms,
    tolerance: Tolerance,
) -> Result<Check, String> {
    let (gamma, gamma_ref) = sides.both(Block::Gamma)?;

    let Some(c_ref) = sides.desired.get(Block::C) else {
        let (beta, beta_ref) = sides.both(Block::Beta)?;
        let rows = variable_rows(beta, terms);
        return Ok(Check::Holds {
            condition: gamma.ncols() == gamma_ref.ncols() && rows == beta_ref.ncols(),
            detail: format!(
                "reference has no deterministic block, but fitted Gamma has {} columns \
                 (reference {}) and fitted beta has {} variable rows (reference {})",
                gamma.ncols(),
                gamma_ref.ncols(),
                rows,
                beta_ref.ncols()
            ),
        });
    };

    if gamma.ncols() <= gamma_ref.ncols() {
        return Ok(Check::Holds {
            condition: false,
            detail: format!(
                "reference has a deterministic block of shape ({}, {}), but fitted Gamma has \
                 no columns beyond the {} lag columns",
                c_ref.nrows(),
                c_ref.ncols(),
                gamma_ref.ncols()
            ),
        });
    }

    let trailing = gamma
        .columns(gamma_ref.ncols(), gamma.ncols() - gamma_ref.ncols())
        .clone_owned();
    Ok(all_close(trailing, c_ref.clone(), tolerance))
}

fn lin_trend_check(
    sides: &Sides<'_>,
    terms: DeterministicTerms,
    tolerance: Tolerance,
) -> Result<Check, String> {
    if terms.has_linear_trend() {
        let alpha = sides.obtained(Block::Alpha)?;
        let beta = sides.obtained(Block::Beta)?;
        let desired = sides.desired(Block::LinTrend)?;
        if beta.nrows() == 0 || alpha.ncols() != beta.ncols() {
            return Err(format!(
                "cannot form alpha * beta' from alpha {:?} and beta {:?}",
                alpha.shape(),
                beta.shape()
            ));
        }
        let pi = alpha * beta.transpose();
        let last = pi.columns(pi.ncols() - 1, 1).clone_owned();
        return Ok(all_close(last, desired.clone(), tolerance));
    }

    let (beta, beta_ref) = sides.both(Block::Beta)?;
    let has_ref_trend = sides.desired.contains(Block::LinTrend);
    Ok(Check::Holds {
        condition: beta.nrows() == beta_ref.ncols() && !has_ref_trend,
        detail: format!(
            "configuration has no linear trend, but fitted beta has {} rows (reference {}) \
             and the reference {} a linear trend block",
            beta.nrows(),
            beta_ref.ncols(),
            if has_ref_trend { "has" } else { "has no" }
        ),
    })
}
