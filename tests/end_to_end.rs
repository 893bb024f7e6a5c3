//! Simulated dataset + written reference files through the full check pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_abs_diff_eq;
use nalgebra::DMatrix;
use tempfile::TempDir;

use vecm_check::app::pipeline::{emit_reference, run_check, run_fit};
use vecm_check::data::{DatasetProvider, SimulationConfig, simulate};
use vecm_check::domain::{Block, DatasetId, DatasetSpec, DeterministicTerms, HarnessConfig};
use vecm_check::io::{CsvTableSource, load_reference, parse_reference, reference_file_name, render_reference};

struct Fixture {
    _dir: TempDir,
    config: HarnessConfig,
}

impl Fixture {
    fn results_file(&self, terms: DeterministicTerms) -> PathBuf {
        self.config
            .results_dir
            .join(reference_file_name(&DatasetId::new("sim"), &self.config.source_tag, terms))
    }
}

fn sim_spec() -> DatasetSpec {
    DatasetSpec {
        id: DatasetId::new("sim"),
        file: PathBuf::from("sim.csv"),
        year_column: "year".to_string(),
        quarter_column: "quarter".to_string(),
        series: ["Dp".to_string(), "R".to_string()],
    }
}

/// Write a simulated dataset and one reference file per configuration.
fn fixture() -> Fixture {
    fixture_with(HarnessConfig::default().deterministic_terms)
}

fn fixture_with(deterministic_terms: Vec<DeterministicTerms>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let results_dir = dir.path().join("results");
    fs::create_dir_all(&data_dir).unwrap();

    let table = simulate(&SimulationConfig::default()).unwrap();
    table.write_csv(&data_dir.join("sim.csv")).unwrap();

    let config = HarnessConfig {
        data_dir,
        results_dir: results_dir.clone(),
        datasets: vec![sim_spec()],
        deterministic_terms,
        ..HarnessConfig::default()
    };

    for &terms in &config.deterministic_terms {
        let output = run_fit(&config, "sim", terms).unwrap();
        emit_reference(&config, &output, &results_dir).unwrap();
    }

    Fixture { _dir: dir, config }
}

fn rewrite_block(path: &Path, terms: DeterministicTerms, block: Block, f: impl Fn(&mut DMatrix<f64>)) {
    let text = fs::read_to_string(path).unwrap();
    let mut bundle = parse_reference(&text, terms).unwrap();
    let mut m = bundle.get(block).unwrap().clone();
    f(&mut m);
    bundle.insert(block, m);
    fs::write(path, render_reference(&bundle, terms, "perturbed")).unwrap();
}

#[test]
fn matching_references_pass_all_twenty_four_cases() {
    let fx = fixture();
    let report = run_check(&fx.config).unwrap();

    assert_eq!(report.outcomes.len(), 24);
    let failures: Vec<_> = report.failures().map(|o| o.message.clone()).collect();
    assert!(report.all_passed(), "{failures:#?}");

    // Block-major order over the four configurations.
    assert_eq!(report.outcomes[0].name, "test_ml_Gamma");
    assert_eq!(report.outcomes[4].name, "test_ml_alpha");
    assert_eq!(report.outcomes[23].name, "test_ml_Sigma_u");
    assert_eq!(report.outcomes[23].terms, DeterministicTerms::ConstantLinearTrend);
}

#[test]
fn linear_trend_only_references_pass_all_six_cases() {
    let fx = fixture_with(vec![DeterministicTerms::LinearTrend]);
    let report = run_check(&fx.config).unwrap();

    assert_eq!(report.outcomes.len(), 6);
    let failures: Vec<_> = report.failures().map(|o| o.message.clone()).collect();
    assert!(report.all_passed(), "{failures:#?}");

    let reference = load_reference(
        &fx.config.results_dir,
        &DatasetId::new("sim"),
        "jmulti",
        DeterministicTerms::LinearTrend,
    )
    .unwrap();
    assert!(!reference.contains(Block::C));
    assert_eq!(reference.get(Block::Beta).unwrap().shape(), (1, 2));
    assert_eq!(reference.get(Block::LinTrend).unwrap().shape(), (2, 1));
}

#[test]
fn emitted_reference_matches_the_fit() {
    let fx = fixture();
    let terms = DeterministicTerms::ConstantLinearTrend;
    let output = run_fit(&fx.config, "sim", terms).unwrap();
    let reference = load_reference(&fx.config.results_dir, &DatasetId::new("sim"), "jmulti", terms).unwrap();

    let alpha = reference.get(Block::Alpha).unwrap();
    assert_abs_diff_eq!(alpha[(0, 0)], output.fit.alpha[(0, 0)], epsilon = 1e-8);
    assert_abs_diff_eq!(alpha[(1, 0)], output.fit.alpha[(1, 0)], epsilon = 1e-8);

    // One relation per row, trend row left to the lin_trend block.
    let beta = reference.get(Block::Beta).unwrap();
    assert_eq!(beta.shape(), (1, 2));
    assert_abs_diff_eq!(beta[(0, 0)], 1.0, epsilon = 1e-12);

    let trend = reference.get(Block::LinTrend).unwrap();
    let expected = output.fit.lin_trend().unwrap();
    assert_abs_diff_eq!(trend[(0, 0)], expected[(0, 0)], epsilon = 1e-8);

    assert_eq!(reference.get(Block::Gamma).unwrap().shape(), (2, 6));
    assert_eq!(reference.get(Block::C).unwrap().shape(), (2, 1));
    assert!(!reference.contains(Block::Var));
    assert_eq!(reference.get(Block::SigmaU).unwrap().shape(), (2, 2));
}

#[test]
fn perturbed_block_fails_exactly_that_case() {
    let fx = fixture();
    rewrite_block(
        &fx.results_file(DeterministicTerms::Constant),
        DeterministicTerms::Constant,
        Block::Alpha,
        |m| m[(0, 0)] += 0.1,
    );

    let report = run_check(&fx.config).unwrap();
    assert_eq!(report.failed(), 1);

    let failure = report.failures().next().unwrap();
    assert_eq!(failure.block, Block::Alpha);
    assert_eq!(failure.terms, DeterministicTerms::Constant);
    let message = failure.message.as_deref().unwrap();
    assert!(
        message.starts_with("Error in alpha for:\n- Dataset: sim\n- Deterministic terms: c\n"),
        "{message}"
    );
    assert!(message.contains("Mismatched elements: 1 / 2"), "{message}");
}

#[test]
fn missing_reference_file_aborts_setup() {
    let fx = fixture();
    let path = fx.results_file(DeterministicTerms::ConstantSeasonal);
    fs::remove_file(&path).unwrap();

    let err = run_check(&fx.config).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(err.message().contains("sim_jmulti_cs.txt"), "{}", err.message());
}

#[test]
fn malformed_reference_file_aborts_setup() {
    let fx = fixture();
    let path = fx.results_file(DeterministicTerms::None);
    fs::write(&path, "Lagged endogenous term:\n 0.1 0.2\n 0.3\n").unwrap();

    let err = run_check(&fx.config).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(err.message().contains("expects 2 values per row"), "{}", err.message());
}

#[test]
fn provider_serves_cached_dataset_after_source_is_removed() {
    let fx = fixture();
    let spec = sim_spec();
    let mut provider = DatasetProvider::new(CsvTableSource::new(&fx.config.data_dir));

    let first = provider.load(&spec).unwrap().values.clone();
    fs::remove_file(fx.config.data_dir.join("sim.csv")).unwrap();
    let second = provider.load(&spec).unwrap();

    assert_eq!(second.values, first);
    assert_eq!(second.labels[0], "1972Q2");
}
