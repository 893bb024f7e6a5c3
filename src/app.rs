//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - merges the TOML configuration with CLI overrides
//! - runs the check suite, a single fit, or the simulator
//! - prints reports and writes optional exports

use clap::Parser;

use crate::cli::{CheckArgs, Command, CommonArgs, FitArgs, SimulateArgs};
use crate::data::{SimulationConfig, simulate};
use crate::domain::HarnessConfig;
use crate::error::{AppError, exit};

pub mod pipeline;

/// Entry point for the `vecm-check` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Check(args) => handle_check(args),
        Command::Fit(args) => handle_fit(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_check(args: CheckArgs) -> Result<(), AppError> {
    let config = check_config_from_args(&args)?;
    let report = pipeline::run_check(&config)?;

    print!("{}", crate::report::format_suite(&report));

    if let Some(path) = &args.export {
        crate::io::export::write_outcomes_json(path, &report, &config)?;
    }

    if report.all_passed() {
        Ok(())
    } else {
        Err(AppError::new(
            exit::CASES_FAILED,
            format!("{} of {} cases failed.", report.failed(), report.outcomes.len()),
        ))
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let mut config = config_from_common(&args.common)?;
    if let Some(rank) = args.rank {
        config.coint_rank = rank;
    }
    if let Some(lags) = args.lags {
        config.max_diff_lags = lags;
    }

    let dataset_id = match &args.dataset {
        Some(id) => id.clone(),
        None => config
            .datasets
            .first()
            .map(|s| s.id.to_string())
            .ok_or_else(|| AppError::new(exit::INPUT, "No datasets registered."))?,
    };

    let output = pipeline::run_fit(&config, &dataset_id, args.terms)?;
    println!(
        "{}",
        crate::report::format_fit(&output.dataset, output.terms, &output.fit)
    );

    if let Some(dir) = &args.emit_reference {
        let path = pipeline::emit_reference(&config, &output, dir)?;
        println!("Reference written to {}", path.display());
    }
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let sim = SimulationConfig {
        nobs: args.nobs,
        seed: args.seed,
        start_year: args.start_year,
        start_quarter: args.start_quarter,
        coint_coef: args.coint_coef,
        ..SimulationConfig::default()
    };
    let table = simulate(&sim)?;
    table.write_csv(&args.out)?;
    println!("Wrote {} quarters to {}", table.values.nrows(), args.out.display());
    Ok(())
}

/// Configuration file (or defaults) with directory overrides applied.
pub fn config_from_common(args: &CommonArgs) -> Result<HarnessConfig, AppError> {
    let mut config = crate::io::config::load_config(args.config.as_deref())?;
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &args.results_dir {
        config.results_dir = dir.clone();
    }
    Ok(config)
}

/// Configuration for `check`, narrowed by the dataset and terms filters.
pub fn check_config_from_args(args: &CheckArgs) -> Result<HarnessConfig, AppError> {
    let mut config = config_from_common(&args.common)?;

    if !args.datasets.is_empty() {
        for id in &args.datasets {
            if !config.datasets.iter().any(|s| s.id.as_str() == id) {
                return Err(AppError::new(exit::INPUT, format!("Unknown dataset '{id}'.")));
            }
        }
        config
            .datasets
            .retain(|s| args.datasets.iter().any(|id| id == s.id.as_str()));
    }
    if !args.terms.is_empty() {
        config.deterministic_terms = args.terms.clone();
    }

    crate::io::config::validate(&config)?;
    Ok(config)
}
