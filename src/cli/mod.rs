//! Command-line parsing for the VECM reference checker.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the estimation and comparison code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::DeterministicTerms;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "vecm-check",
    version,
    about = "Compare VECM estimates against JMulTi reference output"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit every dataset/configuration and compare against the reference files.
    ///
    /// Prints one line per case and a summary; exits with code 1 when any case fails.
    Check(CheckArgs),
    /// Fit a single dataset and print the estimated blocks.
    Fit(FitArgs),
    /// Write a synthetic cointegrated dataset as CSV.
    Simulate(SimulateArgs),
}

/// Options shared by commands that read the harness configuration.
#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    /// TOML configuration file (datasets, configurations, tolerances).
    #[arg(long, env = "VECM_CHECK_CONFIG", value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Directory holding the dataset CSV files.
    #[arg(long, env = "VECM_CHECK_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory holding the reference result files.
    #[arg(long, env = "VECM_CHECK_RESULTS_DIR", value_name = "DIR")]
    pub results_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Only check these datasets (repeatable). Defaults to all registered datasets.
    #[arg(long = "dataset", value_name = "ID")]
    pub datasets: Vec<String>,

    /// Only check these deterministic-term configurations (repeatable; '' or 'none' for none).
    #[arg(long = "terms", value_name = "TERMS")]
    pub terms: Vec<DeterministicTerms>,

    /// Export case outcomes to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Dataset id. Defaults to the first registered dataset.
    #[arg(long, value_name = "ID")]
    pub dataset: Option<String>,

    /// Deterministic terms ('', 'c', 'cs', 'clt', 'lt').
    #[arg(long, default_value = "c")]
    pub terms: DeterministicTerms,

    /// Cointegration rank (overrides the configuration).
    #[arg(long)]
    pub rank: Option<usize>,

    /// Number of lagged differences (overrides the configuration).
    #[arg(long)]
    pub lags: Option<usize>,

    /// Write the fit as a reference file into this directory.
    #[arg(long = "emit-reference", value_name = "DIR")]
    pub emit_reference: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    /// Number of quarters to generate.
    #[arg(short = 'n', long, default_value_t = 200)]
    pub nobs: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Year of the first observation.
    #[arg(long, default_value_t = 1972)]
    pub start_year: i32,

    /// Quarter (1-4) of the first observation.
    #[arg(long, default_value_t = 2)]
    pub start_quarter: u32,

    /// Long-run coefficient of R in the Dp equation.
    #[arg(long, default_value_t = 0.5)]
    pub coint_coef: f64,
}
