//! Dataset provider.
//!
//! Turns a raw table (year, quarter, two observed series) into a
//! quarter-indexed `Dataset` and caches it per dataset id. Repeated loads of
//! the same id return the cached table without touching the source again.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use log::{debug, warn};
use nalgebra::DMatrix;
use thiserror::Error;

use crate::domain::{DatasetId, DatasetSpec};
use crate::error::{AppError, exit};
use crate::io::table::{RawTable, TableSource};

/// Dataset loading and validation failures.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("failed to open '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(String),
    #[error("dataset '{dataset}' is missing required column '{column}'")]
    MissingColumn { dataset: DatasetId, column: String },
    #[error("dataset '{dataset}', row {row}: column '{column}' has invalid value '{value}'")]
    InvalidValue {
        dataset: DatasetId,
        row: usize,
        column: String,
        value: String,
    },
    #[error("dataset '{dataset}', row {row}: invalid period label '{label}'")]
    InvalidPeriod {
        dataset: DatasetId,
        row: usize,
        label: String,
    },
    #[error("dataset '{dataset}', row {row}: period {label} does not come after the previous row")]
    OutOfOrder {
        dataset: DatasetId,
        row: usize,
        label: String,
    },
    #[error("dataset '{0}' has no rows")]
    Empty(DatasetId),
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        let code = match err {
            DataError::Io { .. } | DataError::Csv(_) | DataError::MissingColumn { .. } => exit::INPUT,
            _ => exit::DATA,
        };
        AppError::new(code, err.to_string())
    }
}

/// A quarter-indexed table with exactly two observed series.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub id: DatasetId,
    /// `"YYYYQn"` labels, one per row.
    pub labels: Vec<String>,
    /// Last calendar day of each quarter.
    pub periods: Vec<NaiveDate>,
    pub series_names: [String; 2],
    /// Observations, one row per quarter (T × 2).
    pub values: DMatrix<f64>,
}

impl Dataset {
    pub fn nobs(&self) -> usize {
        self.values.nrows()
    }

    /// The endogenous data matrix passed to the estimator.
    pub fn endog(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Season of the first row, counting Q1 as season 0.
    pub fn first_season(&self, seasons: usize) -> usize {
        match self.periods.first() {
            Some(date) if seasons > 0 => (date.month0() / 3) as usize % seasons,
            _ => 0,
        }
    }
}

/// Caching dataset loader over a table source.
pub struct DatasetProvider<S: TableSource> {
    source: S,
    cache: HashMap<DatasetId, Dataset>,
}

impl<S: TableSource> DatasetProvider<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: HashMap::new(),
        }
    }

    /// Load (or return the cached) dataset for `spec`.
    pub fn load(&mut self, spec: &DatasetSpec) -> Result<&Dataset, DataError> {
        if !self.cache.contains_key(&spec.id) {
            let table = self.source.load_table(spec)?;
            let dataset = build_dataset(spec, &table)?;
            debug!("loaded dataset '{}' ({} quarters)", spec.id, dataset.nobs());
            self.cache.insert(spec.id.clone(), dataset);
        }
        Ok(&self.cache[&spec.id])
    }

    pub fn cached(&self, id: &DatasetId) -> Option<&Dataset> {
        self.cache.get(id)
    }
}

/// Validate a raw table and build the quarter-indexed dataset.
pub fn build_dataset(spec: &DatasetSpec, table: &RawTable) -> Result<Dataset, DataError> {
    let column = |name: &str| {
        table.column(name).ok_or_else(|| DataError::MissingColumn {
            dataset: spec.id.clone(),
            column: name.to_string(),
        })
    };

    // Check the whole schema before reading any value.
    let years = column(&spec.year_column)?;
    let quarters = column(&spec.quarter_column)?;
    let first = column(&spec.series[0])?;
    let second = column(&spec.series[1])?;

    if table.n_rows() == 0 {
        return Err(DataError::Empty(spec.id.clone()));
    }

    let n = table.n_rows();
    let mut labels = Vec::with_capacity(n);
    let mut periods = Vec::with_capacity(n);
    let mut values = DMatrix::<f64>::zeros(n, 2);
    let mut prev_ordinal: Option<i64> = None;

    for row in 0..n {
        let year = parse_integer(years[row]).ok_or_else(|| DataError::InvalidValue {
            dataset: spec.id.clone(),
            row: row + 1,
            column: spec.year_column.clone(),
            value: years[row].to_string(),
        })?;
        let quarter = parse_integer(quarters[row]).ok_or_else(|| DataError::InvalidValue {
            dataset: spec.id.clone(),
            row: row + 1,
            column: spec.quarter_column.clone(),
            value: quarters[row].to_string(),
        })?;

        let label = format!("{year}Q{quarter}");
        let period = parse_quarter_label(&label).ok_or_else(|| DataError::InvalidPeriod {
            dataset: spec.id.clone(),
            row: row + 1,
            label: label.clone(),
        })?;

        let ordinal = year * 4 + (quarter - 1);
        if let Some(prev) = prev_ordinal {
            if ordinal <= prev {
                return Err(DataError::OutOfOrder {
                    dataset: spec.id.clone(),
                    row: row + 1,
                    label,
                });
            }
            if ordinal != prev + 1 {
                warn!(
                    "dataset '{}': gap of {} quarters before {label}",
                    spec.id,
                    ordinal - prev - 1
                );
            }
        }
        prev_ordinal = Some(ordinal);

        for (col, (cells, name)) in [(&first, &spec.series[0]), (&second, &spec.series[1])]
            .into_iter()
            .enumerate()
        {
            let cell = cells[row];
            let v = cell
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| DataError::InvalidValue {
                    dataset: spec.id.clone(),
                    row: row + 1,
                    column: name.clone(),
                    value: cell.to_string(),
                })?;
            values[(row, col)] = v;
        }

        labels.push(label);
        periods.push(period);
    }

    Ok(Dataset {
        id: spec.id.clone(),
        labels,
        periods,
        series_names: spec.series.clone(),
        values,
    })
}

/// Convert a `"YYYYQn"` label into the last calendar day of that quarter.
pub fn parse_quarter_label(label: &str) -> Option<NaiveDate> {
    let (year, quarter) = label.trim().split_once(['Q', 'q'])?;
    let year: i32 = year.parse().ok()?;
    let quarter: u32 = quarter.parse().ok()?;
    quarter_end(year, quarter)
}

fn quarter_end(year: i32, quarter: u32) -> Option<NaiveDate> {
    match quarter {
        4 => NaiveDate::from_ymd_opt(year, 12, 31),
        1..=3 => NaiveDate::from_ymd_opt(year, quarter * 3 + 1, 1)?.pred_opt(),
        _ => None,
    }
}

/// Year/quarter cells may be written as floats (`1972.0`); they must still be
/// whole numbers.
fn parse_integer(cell: &str) -> Option<i64> {
    if let Ok(v) = cell.parse::<i64>() {
        return Some(v);
    }
    let v = cell.parse::<f64>().ok()?;
    if v.is_finite() && v.fract() == 0.0 {
        Some(v as i64)
    } else {
        None
    }
}
