//! Reference result files (JMulTi text output).
//!
//! One file per (dataset, deterministic-term configuration), named
//! `{dataset}_{source_tag}_{terms}.txt` under the results directory.
//!
//! The parser is a small state machine over a configuration-dependent section
//! table. Only the *next expected* header can advance the cursor, so repeated
//! or out-of-order header text further down the file is treated as noise.
//! Every line without decimal tokens is skipped. Sections that are not
//! collected (the VAR representation) only move the cursor; their rows are
//! neither kept nor checked.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use nalgebra::DMatrix;
use regex::Regex;
use thiserror::Error;

use crate::domain::{Block, CoefficientBundle, DatasetId, DeterministicTerms};
use crate::error::{AppError, exit};

/// One entry of the section table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpec {
    pub block: Block,
    pub header: &'static str,
    /// Missing required sections are a parse error; optional ones are left out.
    pub required: bool,
    /// Whether rows under the header become a matrix in the bundle.
    pub collect: bool,
}

const GAMMA: SectionSpec = SectionSpec {
    block: Block::Gamma,
    header: "Lagged endogenous term",
    required: true,
    collect: true,
};
const DETERMINISTIC: SectionSpec = SectionSpec {
    block: Block::C,
    header: "Deterministic term",
    required: true,
    collect: true,
};
const LOADING: SectionSpec = SectionSpec {
    block: Block::Alpha,
    header: "Loading coefficients",
    required: true,
    collect: true,
};
const COINTEGRATION: SectionSpec = SectionSpec {
    block: Block::Beta,
    header: "Estimated cointegration relation",
    required: true,
    collect: true,
};
const LINEAR_TREND: SectionSpec = SectionSpec {
    block: Block::LinTrend,
    header: "Linear trend",
    required: true,
    collect: true,
};
const VAR_REPRESENTATION: SectionSpec = SectionSpec {
    block: Block::Var,
    header: "VAR representation",
    required: false,
    collect: false,
};
const RESIDUAL_COVARIANCE: SectionSpec = SectionSpec {
    block: Block::SigmaU,
    header: "Covariance matrix of residuals",
    required: false,
    collect: true,
};

/// Expected sections, in file order, for a configuration.
///
/// JMulTi leaves out the deterministic block for `""` and `"lt"`, and only
/// prints a linear-trend block when the trend is part of the model.
pub fn section_table(terms: DeterministicTerms) -> Vec<SectionSpec> {
    let mut table = vec![GAMMA];
    if terms.has_deterministic_block() {
        table.push(DETERMINISTIC);
    }
    table.push(LOADING);
    table.push(COINTEGRATION);
    if terms.has_linear_trend() {
        table.push(LINEAR_TREND);
    }
    table.push(VAR_REPRESENTATION);
    table.push(RESIDUAL_COVARIANCE);
    table
}

/// Parse failures inside a reference file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("line {line}: section '{section}' expects {expected} values per row, found {found}")]
    Ragged {
        section: Block,
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: section '{section}' has no numeric rows")]
    EmptySection { section: Block, line: usize },
    #[error("required section '{section}' (header \"{header}\") not found")]
    MissingSection { section: Block, header: &'static str },
}

/// Reference loading failures.
#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("failed to read reference file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

impl From<ReferenceError> for AppError {
    fn from(err: ReferenceError) -> Self {
        AppError::new(exit::INPUT, err.to_string())
    }
}

/// `{dataset}_{source_tag}_{terms}.txt`
pub fn reference_file_name(dataset: &DatasetId, source_tag: &str, terms: DeterministicTerms) -> String {
    format!("{dataset}_{source_tag}_{terms}.txt")
}

pub fn reference_path(
    dir: &Path,
    dataset: &DatasetId,
    source_tag: &str,
    terms: DeterministicTerms,
) -> PathBuf {
    dir.join(reference_file_name(dataset, source_tag, terms))
}

/// Locate and parse the reference file for one (dataset, configuration) pair.
pub fn load_reference(
    dir: &Path,
    dataset: &DatasetId,
    source_tag: &str,
    terms: DeterministicTerms,
) -> Result<CoefficientBundle, ReferenceError> {
    let path = reference_path(dir, dataset, source_tag, terms);
    let text = fs::read_to_string(&path).map_err(|source| ReferenceError::Io {
        path: path.clone(),
        source,
    })?;
    parse_reference(&text, terms).map_err(|source| ReferenceError::Parse { path, source })
}

/// Parse reference text for a configuration.
pub fn parse_reference(text: &str, terms: DeterministicTerms) -> Result<CoefficientBundle, ParseError> {
    parse_sections(text, &section_table(terms))
}

/// Parse text against an explicit section table.
pub fn parse_sections(text: &str, table: &[SectionSpec]) -> Result<CoefficientBundle, ParseError> {
    let mut parser = SectionParser::new(table);
    for (idx, line) in text.lines().enumerate() {
        parser.feed(idx + 1, line)?;
    }
    parser.finish()
}

#[derive(Debug)]
struct OpenSection {
    spec: SectionSpec,
    header_line: usize,
    width: Option<usize>,
    rows: Vec<Vec<f64>>,
}

impl OpenSection {
    fn close(self) -> Result<(Block, DMatrix<f64>), ParseError> {
        let width = match self.width {
            Some(w) if !self.rows.is_empty() => w,
            _ => {
                return Err(ParseError::EmptySection {
                    section: self.spec.block,
                    line: self.header_line,
                });
            }
        };
        let flat: Vec<f64> = self.rows.into_iter().flatten().collect();
        let n_rows = flat.len() / width;
        Ok((self.spec.block, DMatrix::from_row_slice(n_rows, width, &flat)))
    }
}

struct SectionParser<'a> {
    table: &'a [SectionSpec],
    /// Lowercased headers, same order as `table`.
    headers: Vec<String>,
    next: usize,
    current: Option<OpenSection>,
    bundle: CoefficientBundle,
}

impl<'a> SectionParser<'a> {
    fn new(table: &'a [SectionSpec]) -> Self {
        Self {
            table,
            headers: table.iter().map(|s| s.header.to_ascii_lowercase()).collect(),
            next: 0,
            current: None,
            bundle: CoefficientBundle::new(),
        }
    }

    fn feed(&mut self, line_no: usize, line: &str) -> Result<(), ParseError> {
        if self.next < self.table.len() && line.to_ascii_lowercase().contains(&self.headers[self.next]) {
            self.close_current()?;
            self.current = Some(OpenSection {
                spec: self.table[self.next],
                header_line: line_no,
                width: None,
                rows: Vec::new(),
            });
            self.next += 1;
            return Ok(());
        }

        // Preamble before the first header, or a section that is only skipped.
        let Some(section) = self.current.as_mut().filter(|s| s.spec.collect) else {
            return Ok(());
        };

        let values = decimal_tokens(line);
        if values.is_empty() {
            return Ok(());
        }

        match section.width {
            None => section.width = Some(values.len()),
            Some(expected) if expected != values.len() => {
                return Err(ParseError::Ragged {
                    section: section.spec.block,
                    line: line_no,
                    expected,
                    found: values.len(),
                });
            }
            Some(_) => {}
        }
        section.rows.push(values);
        Ok(())
    }

    fn close_current(&mut self) -> Result<(), ParseError> {
        if let Some(section) = self.current.take().filter(|s| s.spec.collect) {
            let (block, matrix) = section.close()?;
            self.bundle.insert(block, matrix);
        }
        Ok(())
    }

    fn finish(mut self) -> Result<CoefficientBundle, ParseError> {
        self.close_current()?;
        if let Some(missing) = self
            .table
            .iter()
            .find(|s| s.required && !self.bundle.contains(s.block))
        {
            return Err(ParseError::MissingSection {
                section: missing.block,
                header: missing.header,
            });
        }
        Ok(self.bundle)
    }
}

/// A decimal `-?digits.digits` at the start of the line or after whitespace.
static DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(-?[0-9]+\.[0-9]+)").unwrap_or_else(|e| panic!("invalid decimal pattern: {e}"))
});

/// Decimal numbers on a line, in order.
///
/// Standard errors and t-values printed as `(0.123)` or `[1.23]` do not follow
/// whitespace and are ignored. Trailing marks such as `-0.196***` or `0.083,`
/// do not hide the number in front of them.
fn decimal_tokens(line: &str) -> Vec<f64> {
    DECIMAL
        .captures_iter(line)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLT_OUTPUT: &str = "\
VECM estimation, JMulTi
endogenous: Dp R   sample range: [1973 Q3, 1998 Q4], T = 102

Lagged endogenous term:
===========================================
               d(Dp)          d(R)
d(Dp)(t-1)    -0.196  0.070  -0.040  0.000  -0.010  0.020
              (0.089) (0.345)
d(R)(t-1)      0.014  0.188  -0.045  0.010  -0.030  0.090

Deterministic term:
CONST          0.011
               0.025

Loading coefficients:
              -0.221
               0.059
Estimated cointegration relation:
    1.000  -3.962
Linear trend:
   -0.000123
    0.000034
VAR REPRESENTATION
   0.531  0.071   0.196  -0.040
   0.010  1.050  -0.014   0.188
";

    #[test]
    fn section_table_depends_on_configuration() {
        let blocks = |t| section_table(t).iter().map(|s| s.block).collect::<Vec<_>>();
        assert_eq!(
            blocks(DeterministicTerms::None),
            vec![Block::Gamma, Block::Alpha, Block::Beta, Block::Var, Block::SigmaU]
        );
        assert_eq!(
            blocks(DeterministicTerms::ConstantLinearTrend),
            vec![
                Block::Gamma,
                Block::C,
                Block::Alpha,
                Block::Beta,
                Block::LinTrend,
                Block::Var,
                Block::SigmaU
            ]
        );
        assert_eq!(
            blocks(DeterministicTerms::LinearTrend),
            vec![Block::Gamma, Block::Alpha, Block::Beta, Block::LinTrend, Block::Var, Block::SigmaU]
        );
    }

    #[test]
    fn file_names_join_dataset_tag_and_terms() {
        let ds = DatasetId::new("e6");
        assert_eq!(reference_file_name(&ds, "jmulti", DeterministicTerms::None), "e6_jmulti_.txt");
        assert_eq!(
            reference_file_name(&ds, "jmulti", DeterministicTerms::ConstantLinearTrend),
            "e6_jmulti_clt.txt"
        );
    }

    #[test]
    fn parses_jmulti_style_output() {
        let bundle = parse_reference(CLT_OUTPUT, DeterministicTerms::ConstantLinearTrend).unwrap();

        let gamma = bundle.get(Block::Gamma).unwrap();
        assert_eq!(gamma.shape(), (2, 6));
        assert_eq!(gamma[(0, 0)], -0.196);
        assert_eq!(gamma[(1, 5)], 0.090);

        assert_eq!(bundle.get(Block::C).unwrap().shape(), (2, 1));
        assert_eq!(bundle.get(Block::Alpha).unwrap().shape(), (2, 1));

        let beta = bundle.get(Block::Beta).unwrap();
        assert_eq!(beta.shape(), (1, 2));
        assert_eq!(beta[(0, 1)], -3.962);

        assert_eq!(bundle.get(Block::LinTrend).unwrap().shape(), (2, 1));
        assert!(!bundle.contains(Block::Var));
        assert!(!bundle.contains(Block::SigmaU));
    }

    #[test]
    fn collected_sections_become_matrices_in_order() {
        let (n, m) = (3, 4);
        let mut text = String::from("header noise 1.5 ignored before first section\n");
        let table = section_table(DeterministicTerms::None);
        for (s, spec) in table.iter().enumerate() {
            text.push_str(&format!("{}:\n\n", spec.header));
            for i in 0..n {
                text.push_str("   label");
                for j in 0..m {
                    text.push_str(&format!(" {}.{}{}", s, i, j));
                }
                text.push('\n');
                text.push_str("   (std err)  t-values follow\n\n");
            }
        }

        let bundle = parse_reference(&text, DeterministicTerms::None).unwrap();
        assert_eq!(bundle.len(), 4);
        assert!(!bundle.contains(Block::Var));
        for (s, spec) in table.iter().enumerate().filter(|(_, spec)| spec.collect) {
            let matrix = bundle.get(spec.block).unwrap();
            assert_eq!(matrix.shape(), (n, m), "section {}", spec.block);
            let expected: f64 = format!("{s}.{}{}", n - 1, m - 1).parse().unwrap();
            assert_eq!(matrix[(n - 1, m - 1)], expected);
        }
    }

    #[test]
    fn ragged_section_is_an_error() {
        let text = "Lagged endogenous term\n 0.1 0.2\n 0.3\n";
        let err = parse_reference(text, DeterministicTerms::None).unwrap_err();
        assert_eq!(
            err,
            ParseError::Ragged {
                section: Block::Gamma,
                line: 3,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn missing_required_section_is_an_error() {
        let text = "Lagged endogenous term\n 0.1 0.2\nLoading coefficients\n 0.3\n";
        let err = parse_reference(text, DeterministicTerms::None).unwrap_err();
        assert!(matches!(err, ParseError::MissingSection { section: Block::Beta, .. }));
    }

    #[test]
    fn header_without_rows_is_an_error() {
        let text = "Lagged endogenous term\n\nLoading coefficients\n 0.3\n";
        let err = parse_reference(text, DeterministicTerms::None).unwrap_err();
        assert_eq!(err, ParseError::EmptySection { section: Block::Gamma, line: 1 });
    }

    #[test]
    fn decimal_tokens_skip_integers_and_bracketed_values() {
        assert_eq!(decimal_tokens("d(Dp)(t-1) -0.5 (0.1) [2.0] 3 1.25"), vec![-0.5, 1.25]);
        assert!(decimal_tokens("T = 102, 1973 Q3").is_empty());
        assert!(decimal_tokens(" -.5 1. ").is_empty());
        assert_eq!(decimal_tokens("-10.000"), vec![-10.0]);
    }

    #[test]
    fn decimal_tokens_keep_numbers_with_trailing_marks() {
        assert_eq!(decimal_tokens(" d(Dp)(t-1) -0.196*** 0.070"), vec![-0.196, 0.070]);
        assert_eq!(decimal_tokens("  0.083,  0.011;"), vec![0.083, 0.011]);

        let text = "\
Lagged endogenous term:
 d(Dp)(t-1) -0.196*** 0.070
 d(R)(t-1)   0.014    0.188**
Loading coefficients:
 -0.221
  0.059
Estimated cointegration relation:
  1.000 -3.962
";
        let bundle = parse_reference(text, DeterministicTerms::None).unwrap();
        let gamma = bundle.get(Block::Gamma).unwrap();
        assert_eq!(gamma.shape(), (2, 2));
        assert_eq!(gamma[(0, 0)], -0.196);
        assert_eq!(gamma[(1, 1)], 0.188);
    }

    #[test]
    fn var_representation_is_skipped_without_width_checks() {
        let text = "\
Lagged endogenous term:
 0.10 0.20
 0.30 0.40
Loading coefficients:
 -0.2
  0.1
Estimated cointegration relation:
  1.000 -3.962
VAR REPRESENTATION
modulus of the eigenvalues of the reverse characteristic polynomial:
|z| = ( 1.0000 1.0000 1.2500 1.5000 2.0000 2.2500 2.7500 3.0000 )
A1:
  0.531  0.071
  0.010  1.050
Covariance matrix of residuals:
  (residuals of the VECM)
  0.00002  0.00001
  0.00001  0.00003
";
        let bundle = parse_reference(text, DeterministicTerms::None).unwrap();
        assert!(!bundle.contains(Block::Var));
        assert_eq!(bundle.len(), 4);

        let sigma = bundle.get(Block::SigmaU).unwrap();
        assert_eq!(sigma.shape(), (2, 2));
        assert_eq!(sigma[(1, 1)], 0.00003);
    }
}
