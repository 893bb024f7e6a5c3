//! Shared "check pipeline" logic used by the CLI and the integration tests.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load datasets -> parse references -> fit -> build cases -> run cases
//!
//! The table source and the estimator are parameters so tests can swap either.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::data::{Dataset, DatasetProvider};
use crate::domain::{DeterministicTerms, HarnessConfig};
use crate::error::{AppError, exit};
use crate::fit::{fit_one, fit_request};
use crate::harness::{SuiteReport, TestContext, run_suite};
use crate::io::emit::write_reference;
use crate::io::reference::reference_path;
use crate::io::table::{CsvTableSource, TableSource};
use crate::models::{Estimator, JohansenVecm, VecmFit};

/// Run the setup phase and publish the context.
pub fn prepare_context<S, E>(config: &HarnessConfig, source: S, estimator: &E) -> Result<TestContext, AppError>
where
    S: TableSource,
    E: Estimator + ?Sized,
{
    let mut provider = DatasetProvider::new(source);
    TestContext::setup(config, &mut provider, estimator)
}

/// Setup followed by every comparison case.
pub fn run_check_with<S, E>(config: &HarnessConfig, source: S, estimator: &E) -> Result<SuiteReport, AppError>
where
    S: TableSource,
    E: Estimator + ?Sized,
{
    let ctx = prepare_context(config, source, estimator)?;
    let report = run_suite(&ctx);
    info!(
        "ran {} cases: {} passed, {} failed",
        report.outcomes.len(),
        report.passed(),
        report.failed()
    );
    Ok(report)
}

/// The production check: CSV datasets and the Johansen estimator.
pub fn run_check(config: &HarnessConfig) -> Result<SuiteReport, AppError> {
    run_check_with(config, CsvTableSource::new(&config.data_dir), &JohansenVecm)
}

/// All computed outputs of a single `fit` run.
#[derive(Debug, Clone)]
pub struct FitOutput {
    pub dataset: Dataset,
    pub terms: DeterministicTerms,
    pub fit: VecmFit,
}

/// Fit one registered dataset under one configuration.
pub fn run_fit(config: &HarnessConfig, dataset_id: &str, terms: DeterministicTerms) -> Result<FitOutput, AppError> {
    let spec = config
        .datasets
        .iter()
        .find(|s| s.id.as_str() == dataset_id)
        .ok_or_else(|| AppError::new(exit::INPUT, format!("Unknown dataset '{dataset_id}'.")))?;

    let mut provider = DatasetProvider::new(CsvTableSource::new(&config.data_dir));
    let dataset = provider.load(spec)?.clone();
    let fit = fit_one(&JohansenVecm, &dataset, &fit_request(config, &dataset, terms))?;

    Ok(FitOutput { dataset, terms, fit })
}

/// Write the reference file for a fit into `dir` (created if missing).
pub fn emit_reference(config: &HarnessConfig, output: &FitOutput, dir: &Path) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::new(exit::INPUT, format!("Failed to create '{}': {e}", dir.display())))?;
    let path = reference_path(dir, &output.dataset.id, &config.source_tag, output.terms);
    let title = format!(
        "VECM reference for dataset {} written by vecm-check\nendogenous: {} {}",
        output.dataset.id, output.dataset.series_names[0], output.dataset.series_names[1]
    );
    write_reference(&path, &output.fit, output.terms, &title)?;
    info!("wrote reference file '{}'", path.display());
    Ok(path)
}
