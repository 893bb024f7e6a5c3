//! Harness configuration file (TOML).
//!
//! Every field is optional; anything left out falls back to
//! `HarnessConfig::default()`. Example:
//!
//! ```toml
//! data_dir = "data"
//! results_dir = "results"
//! deterministic_terms = ["", "c", "cs", "clt"]
//!
//! [[datasets]]
//! id = "e6"
//! file = "e6.csv"
//!
//! [tolerance]
//! atol = 0.005
//! rtol = 0.01
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::info;

use crate::domain::HarnessConfig;
use crate::error::{AppError, exit};

/// Load the configuration file, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<HarnessConfig, AppError> {
    let Some(path) = path else {
        return Ok(HarnessConfig::default());
    };
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::new(exit::INPUT, format!("Failed to read config file '{}': {e}", path.display())))?;
    let config = parse_config(&content).map_err(|e| e.context(path.display()))?;
    info!(
        "loaded config '{}' ({} datasets, {} configurations)",
        path.display(),
        config.datasets.len(),
        config.deterministic_terms.len()
    );
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<HarnessConfig, AppError> {
    let config: HarnessConfig =
        toml::from_str(content).map_err(|e| AppError::new(exit::INPUT, format!("Invalid config: {e}")))?;
    validate(&config)?;
    Ok(config)
}

/// Reject configurations the harness cannot run.
pub fn validate(config: &HarnessConfig) -> Result<(), AppError> {
    if config.datasets.is_empty() {
        return Err(AppError::new(exit::INPUT, "Config lists no datasets."));
    }
    if config.deterministic_terms.is_empty() {
        return Err(AppError::new(exit::INPUT, "Config lists no deterministic-term configurations."));
    }

    let mut seen = HashSet::new();
    for spec in &config.datasets {
        if !seen.insert(&spec.id) {
            return Err(AppError::new(exit::INPUT, format!("Dataset '{}' is registered twice.", spec.id)));
        }
    }
    let mut seen_terms = HashSet::new();
    for terms in &config.deterministic_terms {
        if !seen_terms.insert(terms) {
            return Err(AppError::new(
                exit::INPUT,
                format!("Deterministic terms '{terms}' are listed twice."),
            ));
        }
    }

    if config.coint_rank == 0 {
        return Err(AppError::new(exit::INPUT, "coint_rank must be at least 1."));
    }
    if config.seasons < 2 && config.deterministic_terms.iter().any(|t| t.has_seasonal()) {
        return Err(AppError::new(exit::INPUT, "seasons must be at least 2 when seasonal dummies are used."));
    }
    let tol = config.tolerance;
    if !(tol.atol.is_finite() && tol.rtol.is_finite()) || tol.atol < 0.0 || tol.rtol < 0.0 {
        return Err(AppError::new(exit::INPUT, "Tolerances must be finite and non-negative."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DatasetId, DeterministicTerms, Tolerance};

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(parse_config("").unwrap(), HarnessConfig::default());
        assert_eq!(load_config(None).unwrap(), HarnessConfig::default());
    }

    #[test]
    fn overrides_are_merged_with_defaults() {
        let config = parse_config(
            r#"
            results_dir = "ref"
            deterministic_terms = ["c", "lt"]

            [[datasets]]
            id = "sim"
            file = "sim.csv"
            series = ["y1", "y2"]

            [tolerance]
            atol = 0.001
            rtol = 0.0
            "#,
        )
        .unwrap();

        assert_eq!(config.results_dir, Path::new("ref"));
        assert_eq!(config.data_dir, Path::new("data"));
        assert_eq!(
            config.deterministic_terms,
            vec![DeterministicTerms::Constant, DeterministicTerms::LinearTrend]
        );
        assert_eq!(config.datasets.len(), 1);
        assert_eq!(config.datasets[0].id, DatasetId::new("sim"));
        assert_eq!(config.datasets[0].year_column, "year");
        assert_eq!(config.datasets[0].series, ["y1".to_string(), "y2".to_string()]);
        assert_eq!(config.tolerance, Tolerance { atol: 0.001, rtol: 0.0 });
        assert_eq!(config.max_diff_lags, 3);
    }

    #[test]
    fn unknown_terms_are_rejected() {
        let err = parse_config(r#"deterministic_terms = ["ct"]"#).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("ct"), "{}", err.message());
    }

    #[test]
    fn duplicate_datasets_are_rejected() {
        let err = parse_config(
            r#"
            [[datasets]]
            id = "e6"
            file = "a.csv"
            [[datasets]]
            id = "e6"
            file = "b.csv"
            "#,
        )
        .unwrap_err();
        assert!(err.message().contains("twice"));
    }

    #[test]
    fn zero_rank_is_rejected() {
        assert!(parse_config("coint_rank = 0").is_err());
    }
}
