//! Fit every (dataset, configuration) pair once.
//!
//! Pairs are independent, so they are fitted on the rayon pool. The table is
//! assembled only after every fit has returned; a single failure fails the
//! whole setup.

use log::{debug, info};
use rayon::prelude::*;

use crate::data::Dataset;
use crate::domain::{DeterministicTerms, HarnessConfig, ResultTable};
use crate::error::{AppError, exit};
use crate::models::{Estimator, FitRequest, VecmFit};

/// The request the harness sends for one dataset under one configuration.
pub fn fit_request(config: &HarnessConfig, dataset: &Dataset, terms: DeterministicTerms) -> FitRequest {
    FitRequest {
        max_diff_lags: config.max_diff_lags,
        method: config.method,
        deterministic_terms: terms,
        coint_rank: config.coint_rank,
        seasons: config.seasons,
        first_season: dataset.first_season(config.seasons),
    }
}

/// Fit a single dataset, attaching dataset and configuration to any error.
pub fn fit_one<E: Estimator + ?Sized>(
    estimator: &E,
    dataset: &Dataset,
    request: &FitRequest,
) -> Result<VecmFit, AppError> {
    let fit = estimator.fit(dataset.endog(), request).map_err(|e| {
        AppError::new(
            exit::ESTIMATION,
            format!(
                "Estimation failed for dataset '{}' (deterministic terms '{}'): {e}",
                dataset.id,
                request.deterministic_terms.display_name()
            ),
        )
    })?;
    debug!(
        "fitted '{}' terms='{}': nobs={} llf={:.4}",
        dataset.id, request.deterministic_terms, fit.nobs, fit.llf
    );
    Ok(fit)
}

/// Fit all datasets under every configured deterministic-term setting.
pub fn fit_all<E: Estimator + ?Sized>(
    estimator: &E,
    datasets: &[&Dataset],
    config: &HarnessConfig,
) -> Result<ResultTable, AppError> {
    let jobs: Vec<(&Dataset, DeterministicTerms)> = datasets
        .iter()
        .flat_map(|ds| config.deterministic_terms.iter().map(move |&terms| (*ds, terms)))
        .collect();

    let fitted = jobs
        .par_iter()
        .map(|&(ds, terms)| {
            let fit = fit_one(estimator, ds, &fit_request(config, ds, terms))?;
            Ok((ds.id.clone(), terms, fit.to_bundle()))
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let mut table = ResultTable::new();
    for (id, terms, bundle) in fitted {
        table.insert(id, terms, bundle);
    }
    info!("fitted {} (dataset, configuration) pairs", table.len());
    Ok(table)
}
