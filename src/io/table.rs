//! CSV table ingest.
//!
//! This is the raw-table seam behind the dataset provider: it reads a CSV file
//! into header-indexed string cells and leaves all typing/validation to
//! `data::provider`.
//!
//! Design goals:
//! - **Case-insensitive headers** (BOM-safe), so `Dp` and `dp` resolve the same
//! - **No interpretation here**: cells stay strings until the provider asks
//!   for a typed column

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::data::DataError;
use crate::domain::DatasetSpec;

/// A header-indexed table of raw string cells.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    header_map: HashMap<String, usize>,
    rows: Vec<StringRecord>,
}

impl RawTable {
    pub fn from_records(headers: &StringRecord, rows: Vec<StringRecord>) -> Self {
        Self {
            header_map: build_header_map(headers),
            rows,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Column cells (trimmed), or `None` when the column does not exist.
    ///
    /// Short rows yield empty strings for the missing cells.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = *self.header_map.get(&normalize_header_name(name))?;
        Some(
            self.rows
                .iter()
                .map(|r| r.get(idx).map(str::trim).unwrap_or(""))
                .collect(),
        )
    }
}

/// Where dataset tables come from.
pub trait TableSource {
    fn load_table(&self, spec: &DatasetSpec) -> Result<RawTable, DataError>;
}

/// Reads `<root>/<spec.file>` as CSV.
#[derive(Debug, Clone)]
pub struct CsvTableSource {
    root: PathBuf,
}

impl CsvTableSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TableSource for CsvTableSource {
    fn load_table(&self, spec: &DatasetSpec) -> Result<RawTable, DataError> {
        let path = self.root.join(&spec.file);
        read_csv_table(&path)
    }
}

/// Read a CSV file into a `RawTable`.
pub fn read_csv_table(path: &Path) -> Result<RawTable, DataError> {
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| DataError::Csv(format!("{}: failed to read headers: {e}", path.display())))?
        .clone();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header line and lines are 1-based.
        let record = result
            .map_err(|e| DataError::Csv(format!("{}: line {}: {e}", path.display(), idx + 2)))?;
        rows.push(record);
    }

    Ok(RawTable::from_records(&headers, rows))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        let headers = StringRecord::from(headers.to_vec());
        let rows = rows.iter().map(|r| StringRecord::from(r.to_vec())).collect();
        RawTable::from_records(&headers, rows)
    }

    #[test]
    fn headers_are_case_insensitive_and_bom_safe() {
        let t = table(&["\u{feff}Year", "quarter", "Dp"], &[&["1972", "2", "0.01"]]);
        assert_eq!(t.column("year").unwrap(), vec!["1972"]);
        assert_eq!(t.column("DP").unwrap(), vec!["0.01"]);
        assert_eq!(t.column("dp").unwrap(), vec!["0.01"]);
        assert!(t.column("R").is_none());
    }

    #[test]
    fn short_rows_yield_empty_cells() {
        let t = table(&["a", "b"], &[&["1"], &["2", "3"]]);
        assert_eq!(t.column("b").unwrap(), vec!["", "3"]);
    }
}
