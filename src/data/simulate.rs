//! Seeded synthetic quarterly data with one cointegrating relation.
//!
//! The system has a single common stochastic trend:
//!
//! - `R_t  = R_{t-1} + e_t`                  (random walk)
//! - `u_t  = φ u_{t-1} + v_t`                (stationary AR(1), |φ| < 1)
//! - `Dp_t = μ + b R_t + u_t`
//!
//! so `Dp_t - b R_t` is stationary and the normalised cointegrating vector for
//! the column order `[Dp, R]` is `[1, -b]`.

use std::fs::File;
use std::path::Path;

use nalgebra::DMatrix;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::error::{AppError, exit};

/// Parameters of the simulated system.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub nobs: usize,
    pub seed: u64,
    pub start_year: i32,
    /// First quarter (1..=4).
    pub start_quarter: u32,
    /// Long-run coefficient `b`.
    pub coint_coef: f64,
    /// AR(1) coefficient of the equilibrium error.
    pub error_ar: f64,
    /// Level shift `μ` of the first series.
    pub intercept: f64,
    pub trend_sd: f64,
    pub error_sd: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            nobs: 200,
            seed: 42,
            start_year: 1972,
            start_quarter: 2,
            coint_coef: 0.5,
            error_ar: 0.4,
            intercept: 0.01,
            trend_sd: 0.01,
            error_sd: 0.005,
        }
    }
}

/// A simulated table: period fields plus the two series `[Dp, R]`.
#[derive(Debug, Clone)]
pub struct SimulatedTable {
    pub years: Vec<i32>,
    pub quarters: Vec<u32>,
    /// T × 2, columns `[Dp, R]`.
    pub values: DMatrix<f64>,
}

pub const SERIES_NAMES: [&str; 2] = ["Dp", "R"];

pub fn simulate(config: &SimulationConfig) -> Result<SimulatedTable, AppError> {
    if config.nobs < 2 {
        return Err(AppError::new(exit::INPUT, "Simulation needs at least 2 observations."));
    }
    if !(1..=4).contains(&config.start_quarter) {
        return Err(AppError::new(exit::INPUT, "Start quarter must be in 1..=4."));
    }
    if !(config.error_ar.is_finite() && config.error_ar.abs() < 1.0) {
        return Err(AppError::new(exit::INPUT, "Equilibrium error AR coefficient must satisfy |phi| < 1."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let trend_noise = Normal::new(0.0, config.trend_sd)
        .map_err(|e| AppError::new(exit::INPUT, format!("Invalid trend noise: {e}")))?;
    let error_noise = Normal::new(0.0, config.error_sd)
        .map_err(|e| AppError::new(exit::INPUT, format!("Invalid error noise: {e}")))?;

    let n = config.nobs;
    let mut values = DMatrix::<f64>::zeros(n, 2);
    let mut years = Vec::with_capacity(n);
    let mut quarters = Vec::with_capacity(n);

    let mut r = 0.0;
    let mut u = 0.0;
    let mut year = config.start_year;
    let mut quarter = config.start_quarter;

    for t in 0..n {
        r += trend_noise.sample(&mut rng);
        u = config.error_ar * u + error_noise.sample(&mut rng);
        values[(t, 0)] = config.intercept + config.coint_coef * r + u;
        values[(t, 1)] = r;

        years.push(year);
        quarters.push(quarter);
        if quarter == 4 {
            quarter = 1;
            year += 1;
        } else {
            quarter += 1;
        }
    }

    Ok(SimulatedTable {
        years,
        quarters,
        values,
    })
}

impl SimulatedTable {
    /// Write as CSV with columns `year,quarter,Dp,R`.
    pub fn write_csv(&self, path: &Path) -> Result<(), AppError> {
        let file = File::create(path)
            .map_err(|e| AppError::new(exit::INPUT, format!("Failed to create '{}': {e}", path.display())))?;
        let mut writer = csv::Writer::from_writer(file);

        writer
            .write_record(["year", "quarter", SERIES_NAMES[0], SERIES_NAMES[1]])
            .map_err(|e| AppError::new(exit::INPUT, format!("Failed to write CSV header: {e}")))?;
        for t in 0..self.values.nrows() {
            writer
                .write_record([
                    self.years[t].to_string(),
                    self.quarters[t].to_string(),
                    format!("{:.10}", self.values[(t, 0)]),
                    format!("{:.10}", self.values[(t, 1)]),
                ])
                .map_err(|e| AppError::new(exit::INPUT, format!("Failed to write CSV row: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::new(exit::INPUT, format!("Failed to flush '{}': {e}", path.display())))?;
        Ok(())
    }
}
