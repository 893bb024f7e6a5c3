//! Shared domain types.
//!
//! These types are intentionally kept small so they can be:
//!
//! - passed between the fitting path and the reference-parsing path
//! - compared block by block in the harness
//! - exported to JSON once a run completes

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Identifier of a registered dataset (e.g. `e6`).
///
/// The string form is used verbatim in reference file names and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatasetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Which deterministic regressors enter the model.
///
/// Written as the configuration strings `""`, `"c"`, `"cs"`, `"clt"` and `"lt"`.
/// Constants and seasonal dummies are unrestricted (they land in the trailing
/// columns of Gamma); the linear trend is restricted to the cointegration space
/// (it adds a row to beta).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeterministicTerms {
    None,
    Constant,
    ConstantSeasonal,
    ConstantLinearTrend,
    LinearTrend,
}

/// Marker for a linear trend inside a configuration string.
pub const LINEAR_TREND_MARKER: &str = "lt";

impl DeterministicTerms {
    pub const ALL: [DeterministicTerms; 5] = [
        DeterministicTerms::None,
        DeterministicTerms::Constant,
        DeterministicTerms::ConstantSeasonal,
        DeterministicTerms::ConstantLinearTrend,
        DeterministicTerms::LinearTrend,
    ];

    /// The configuration string (`""` for no deterministic terms).
    pub fn as_str(self) -> &'static str {
        match self {
            DeterministicTerms::None => "",
            DeterministicTerms::Constant => "c",
            DeterministicTerms::ConstantSeasonal => "cs",
            DeterministicTerms::ConstantLinearTrend => "clt",
            DeterministicTerms::LinearTrend => "lt",
        }
    }

    /// Human-readable label for diagnostics.
    pub fn display_name(self) -> &'static str {
        match self {
            DeterministicTerms::None => "no det. terms",
            other => other.as_str(),
        }
    }

    pub fn has_constant(self) -> bool {
        matches!(
            self,
            DeterministicTerms::Constant
                | DeterministicTerms::ConstantSeasonal
                | DeterministicTerms::ConstantLinearTrend
        )
    }

    pub fn has_seasonal(self) -> bool {
        self == DeterministicTerms::ConstantSeasonal
    }

    pub fn has_linear_trend(self) -> bool {
        self.as_str().contains(LINEAR_TREND_MARKER)
    }

    /// Whether JMulTi prints a "Deterministic term" block for this configuration.
    pub fn has_deterministic_block(self) -> bool {
        !matches!(self, DeterministicTerms::None | DeterministicTerms::LinearTrend)
    }

    /// Number of unrestricted deterministic columns appended to Gamma.
    pub fn unrestricted_columns(self, seasons: usize) -> usize {
        let constant = usize::from(self.has_constant());
        let seasonal = if self.has_seasonal() {
            seasons.saturating_sub(1)
        } else {
            0
        };
        constant + seasonal
    }
}

impl fmt::Display for DeterministicTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown deterministic-term configuration '{0}' (expected one of '', 'c', 'cs', 'clt', 'lt')")]
pub struct UnknownTerms(pub String);

impl FromStr for DeterministicTerms {
    type Err = UnknownTerms;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("none") {
            return Ok(DeterministicTerms::None);
        }
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTerms(s.to_string()))
    }
}

impl TryFrom<String> for DeterministicTerms {
    type Error = UnknownTerms;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeterministicTerms> for String {
    fn from(value: DeterministicTerms) -> Self {
        value.as_str().to_string()
    }
}

/// Estimation method passed to the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimationMethod {
    /// Maximum likelihood (Johansen reduced-rank regression).
    Ml,
}

impl EstimationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            EstimationMethod::Ml => "ml",
        }
    }
}

/// A named coefficient block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Block {
    Gamma,
    C,
    #[serde(rename = "alpha")]
    Alpha,
    #[serde(rename = "beta")]
    Beta,
    #[serde(rename = "lin_trend")]
    LinTrend,
    #[serde(rename = "Sigma_u")]
    SigmaU,
    #[serde(rename = "VAR")]
    Var,
}

impl Block {
    /// Blocks compared by the harness, in case order.
    pub const COMPARED: [Block; 6] = [
        Block::Gamma,
        Block::Alpha,
        Block::Beta,
        Block::C,
        Block::LinTrend,
        Block::SigmaU,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Block::Gamma => "Gamma",
            Block::C => "C",
            Block::Alpha => "alpha",
            Block::Beta => "beta",
            Block::LinTrend => "lin_trend",
            Block::SigmaU => "Sigma_u",
            Block::Var => "VAR",
        }
    }

    /// Parameter label used in failure messages.
    pub fn parameter_label(self) -> &'static str {
        match self {
            Block::LinTrend => "linear trend coefficients",
            other => other.name(),
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named coefficient matrices produced by either the fitting path or the
/// reference parser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoefficientBundle {
    blocks: BTreeMap<Block, DMatrix<f64>>,
}

impl CoefficientBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, block: Block, matrix: DMatrix<f64>) {
        self.blocks.insert(block, matrix);
    }

    pub fn get(&self, block: Block) -> Option<&DMatrix<f64>> {
        self.blocks.get(&block)
    }

    pub fn contains(&self, block: Block) -> bool {
        self.blocks.contains_key(&block)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Block, &DMatrix<f64>)> {
        self.blocks.iter().map(|(b, m)| (*b, m))
    }
}

/// Dataset → configuration → bundle.
///
/// Built once during setup and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    entries: HashMap<DatasetId, HashMap<DeterministicTerms, CoefficientBundle>>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dataset: DatasetId, terms: DeterministicTerms, bundle: CoefficientBundle) {
        self.entries.entry(dataset).or_default().insert(terms, bundle);
    }

    pub fn get(&self, dataset: &DatasetId, terms: DeterministicTerms) -> Option<&CoefficientBundle> {
        self.entries.get(dataset).and_then(|m| m.get(&terms))
    }

    /// Number of (dataset, configuration) entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Closeness tolerances for element-wise comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub atol: f64,
    pub rtol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            atol: 0.005,
            rtol: 0.01,
        }
    }
}

/// How to read one dataset from the data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub id: DatasetId,
    /// CSV file, relative to the data directory.
    pub file: PathBuf,
    #[serde(default = "default_year_column")]
    pub year_column: String,
    #[serde(default = "default_quarter_column")]
    pub quarter_column: String,
    /// The two observed series, in model column order.
    #[serde(default = "default_series")]
    pub series: [String; 2],
}

impl DatasetSpec {
    /// The interest/inflation dataset (`Dp`, `R`) the reference output was produced for.
    pub fn interest_inflation() -> Self {
        Self {
            id: DatasetId::new("e6"),
            file: PathBuf::from("e6.csv"),
            year_column: default_year_column(),
            quarter_column: default_quarter_column(),
            series: default_series(),
        }
    }
}

fn default_year_column() -> String {
    "year".to_string()
}

fn default_quarter_column() -> String {
    "quarter".to_string()
}

fn default_series() -> [String; 2] {
    ["Dp".to_string(), "R".to_string()]
}

/// A full harness configuration as understood by the pipeline.
///
/// Derived from the optional TOML file plus CLI overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub data_dir: PathBuf,
    pub results_dir: PathBuf,
    /// Tag between dataset id and configuration in reference file names.
    pub source_tag: String,
    pub datasets: Vec<DatasetSpec>,
    pub deterministic_terms: Vec<DeterministicTerms>,
    pub max_diff_lags: usize,
    pub method: EstimationMethod,
    pub coint_rank: usize,
    /// Seasonal period used for seasonal dummies.
    pub seasons: usize,
    pub tolerance: Tolerance,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            results_dir: PathBuf::from("results"),
            source_tag: "jmulti".to_string(),
            datasets: vec![DatasetSpec::interest_inflation()],
            deterministic_terms: vec![
                DeterministicTerms::None,
                DeterministicTerms::Constant,
                DeterministicTerms::ConstantSeasonal,
                DeterministicTerms::ConstantLinearTrend,
            ],
            max_diff_lags: 3,
            method: EstimationMethod::Ml,
            coint_rank: 1,
            seasons: 4,
            tolerance: Tolerance::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_round_trip_through_strings() {
        for terms in DeterministicTerms::ALL {
            let parsed: DeterministicTerms = terms.as_str().parse().unwrap();
            assert_eq!(parsed, terms);
        }
        assert_eq!("none".parse::<DeterministicTerms>().unwrap(), DeterministicTerms::None);
        assert!("ct".parse::<DeterministicTerms>().is_err());
    }

    #[test]
    fn deterministic_block_absent_for_none_and_trend_only() {
        assert!(!DeterministicTerms::None.has_deterministic_block());
        assert!(!DeterministicTerms::LinearTrend.has_deterministic_block());
        assert!(DeterministicTerms::Constant.has_deterministic_block());
        assert!(DeterministicTerms::ConstantLinearTrend.has_deterministic_block());
    }

    #[test]
    fn unrestricted_columns_count_constant_and_seasonals() {
        assert_eq!(DeterministicTerms::None.unrestricted_columns(4), 0);
        assert_eq!(DeterministicTerms::Constant.unrestricted_columns(4), 1);
        assert_eq!(DeterministicTerms::ConstantSeasonal.unrestricted_columns(4), 4);
        assert_eq!(DeterministicTerms::ConstantLinearTrend.unrestricted_columns(4), 1);
        assert_eq!(DeterministicTerms::LinearTrend.unrestricted_columns(4), 0);
    }

    #[test]
    fn only_trend_configurations_carry_the_marker() {
        let with_trend: Vec<_> = DeterministicTerms::ALL
            .into_iter()
            .filter(|t| t.has_linear_trend())
            .collect();
        assert_eq!(
            with_trend,
            vec![DeterministicTerms::ConstantLinearTrend, DeterministicTerms::LinearTrend]
        );
    }

    #[test]
    fn config_defaults_match_reference_sweep() {
        let config = HarnessConfig::default();
        assert_eq!(config.max_diff_lags, 3);
        assert_eq!(config.method, EstimationMethod::Ml);
        assert_eq!(config.tolerance, Tolerance { atol: 0.005, rtol: 0.01 });
        let terms: Vec<&str> = config.deterministic_terms.iter().map(|t| t.as_str()).collect();
        assert_eq!(terms, vec!["", "c", "cs", "clt"]);
    }
}
