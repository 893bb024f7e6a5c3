//! Plain-text formatting.
//!
//! Suite output follows the familiar unittest layout: one line per case, a
//! block per failure, then a summary.

use nalgebra::DMatrix;

use crate::data::Dataset;
use crate::domain::DeterministicTerms;
use crate::harness::{CaseOutcome, SuiteReport};
use crate::models::VecmFit;

const RULE_WIDTH: usize = 70;

/// `test_ml_Gamma (e6, 'clt') ... ok`
pub fn format_case_line(outcome: &CaseOutcome) -> String {
    format!(
        "{} ({}, '{}') ... {}",
        outcome.name,
        outcome.dataset,
        outcome.terms,
        if outcome.passed { "ok" } else { "FAIL" }
    )
}

/// Case lines, failure details and the summary.
pub fn format_suite(report: &SuiteReport) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        out.push_str(&format_case_line(outcome));
        out.push('\n');
    }

    for failure in report.failures() {
        out.push('\n');
        out.push_str(&"=".repeat(RULE_WIDTH));
        out.push('\n');
        out.push_str(&format!(
            "FAIL: {} ({}, '{}')\n",
            failure.name, failure.dataset, failure.terms
        ));
        out.push_str(&"-".repeat(RULE_WIDTH));
        out.push('\n');
        if let Some(message) = &failure.message {
            out.push_str(message);
            out.push('\n');
        }
    }

    out.push('\n');
    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push('\n');
    out.push_str(&format_summary(report));
    out
}

pub fn format_summary(report: &SuiteReport) -> String {
    let n = report.outcomes.len();
    let mut out = format!("Ran {n} test{}\n\n", if n == 1 { "" } else { "s" });
    if report.all_passed() {
        out.push_str("OK\n");
    } else {
        out.push_str(&format!("FAILED (failures={})\n", report.failed()));
    }
    out
}

/// Fitted blocks of a single dataset/configuration.
pub fn format_fit(dataset: &Dataset, terms: DeterministicTerms, fit: &VecmFit) -> String {
    let mut out = String::new();

    out.push_str("=== vecm-check - VECM fit ===\n");
    out.push_str(&format!(
        "Dataset: {} ({}, {})\n",
        dataset.id, dataset.series_names[0], dataset.series_names[1]
    ));
    if let (Some(first), Some(last)) = (dataset.labels.first(), dataset.labels.last()) {
        out.push_str(&format!("Sample: {first} - {last} (T={})\n", dataset.nobs()));
    }
    out.push_str(&format!("Deterministic terms: {}\n", terms.display_name()));
    out.push_str(&format!(
        "Lags (differences): {} | rank: {} | nobs used: {}\n",
        fit.k_ar_diff,
        fit.alpha.ncols(),
        fit.nobs
    ));
    out.push_str(&format!("Log-likelihood: {:.4}\n", fit.llf));
    out.push_str(&format!("Eigenvalues: {}\n", fmt_vec(&fit.eigenvalues)));

    push_block(&mut out, "Gamma (lags)", &fit.lag_gamma());
    let det = fit.deterministic_coefs();
    if det.ncols() > 0 {
        push_block(&mut out, "C (deterministic)", &det);
    }
    push_block(&mut out, "alpha", &fit.alpha);
    push_block(&mut out, "beta", &fit.beta);
    if let Some(trend) = fit.lin_trend() {
        push_block(&mut out, "lin_trend", &trend);
    }
    push_block(&mut out, "Sigma_u", &fit.sigma_u);

    out
}

fn push_block(out: &mut String, title: &str, m: &DMatrix<f64>) {
    out.push('\n');
    out.push_str(&format!("{title} [{}x{}]:\n", m.nrows(), m.ncols()));
    for row in m.row_iter() {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:>12.6}")).collect();
        out.push_str(cells.join(" ").trim_end());
        out.push('\n');
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}
