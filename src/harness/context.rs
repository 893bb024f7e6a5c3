//! Setup phase: everything the cases read, built once.

use log::info;

use crate::data::{Dataset, DatasetProvider};
use crate::domain::{DatasetId, DeterministicTerms, EstimationMethod, HarnessConfig, ResultTable, Tolerance};
use crate::error::AppError;
use crate::fit::fit_all;
use crate::io::reference::load_reference;
use crate::io::table::TableSource;
use crate::models::Estimator;

/// Immutable inputs of a suite run.
#[derive(Debug, Clone)]
pub struct TestContext {
    /// Registration order; cases follow it.
    pub datasets: Vec<DatasetId>,
    pub terms: Vec<DeterministicTerms>,
    pub method: EstimationMethod,
    pub tolerance: Tolerance,
    pub obtained: ResultTable,
    pub desired: ResultTable,
}

impl TestContext {
    /// Load every dataset, parse every reference file and fit every pair.
    ///
    /// Any failure aborts the setup; no case runs against a partial context.
    pub fn setup<S, E>(
        config: &HarnessConfig,
        provider: &mut DatasetProvider<S>,
        estimator: &E,
    ) -> Result<Self, AppError>
    where
        S: TableSource,
        E: Estimator + ?Sized,
    {
        for spec in &config.datasets {
            provider.load(spec)?;
        }
        info!("loaded {} datasets", config.datasets.len());

        let mut desired = ResultTable::new();
        for spec in &config.datasets {
            for &terms in &config.deterministic_terms {
                let bundle = load_reference(&config.results_dir, &spec.id, &config.source_tag, terms)?;
                desired.insert(spec.id.clone(), terms, bundle);
            }
        }
        info!(
            "parsed {} reference files from '{}'",
            desired.len(),
            config.results_dir.display()
        );

        let datasets: Vec<&Dataset> = config
            .datasets
            .iter()
            .filter_map(|spec| provider.cached(&spec.id))
            .collect();
        let obtained = fit_all(estimator, &datasets, config)?;

        Ok(Self {
            datasets: config.datasets.iter().map(|spec| spec.id.clone()).collect(),
            terms: config.deterministic_terms.clone(),
            method: config.method,
            tolerance: config.tolerance,
            obtained,
            desired,
        })
    }
}
