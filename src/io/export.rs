//! Export suite outcomes to JSON.
//!
//! The export is meant to be easy to consume from CI scripts: a small header
//! with the run settings and counts, then one object per case in run order.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::domain::{HarnessConfig, Tolerance};
use crate::error::{AppError, exit};
use crate::harness::{CaseOutcome, SuiteReport};

#[derive(Debug, Serialize)]
struct OutcomeFile<'a> {
    tool: &'static str,
    source_tag: &'a str,
    method: &'static str,
    max_diff_lags: usize,
    tolerance: Tolerance,
    total: usize,
    passed: usize,
    failed: usize,
    outcomes: &'a [CaseOutcome],
}

/// Write the outcomes of a run to a JSON file.
pub fn write_outcomes_json(path: &Path, report: &SuiteReport, config: &HarnessConfig) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(exit::INPUT, format!("Failed to create export JSON '{}': {e}", path.display())))?;

    let export = OutcomeFile {
        tool: "vecm-check",
        source_tag: &config.source_tag,
        method: config.method.as_str(),
        max_diff_lags: config.max_diff_lags,
        tolerance: config.tolerance,
        total: report.outcomes.len(),
        passed: report.passed(),
        failed: report.failed(),
        outcomes: &report.outcomes,
    };

    serde_json::to_writer_pretty(file, &export)
        .map_err(|e| AppError::new(exit::INPUT, format!("Failed to write export JSON: {e}")))?;
    Ok(())
}
