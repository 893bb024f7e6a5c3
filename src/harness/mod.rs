//! Comparison harness.
//!
//! - `context`: setup (datasets, references, fits)
//! - `cases`: one descriptor per (dataset, configuration, block)
//! - `compare`: element-wise closeness

pub mod cases;
pub mod compare;
pub mod context;

pub use cases::{CaseOutcome, Check, TestCase, build_cases, build_err_msg};
pub use compare::{Closeness, Mismatch, allclose};
pub use context::TestContext;

use serde::Serialize;

/// Outcomes of a full run, in case order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteReport {
    pub outcomes: Vec<CaseOutcome>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }
}

/// Run every case. A failing case never stops the others.
pub fn run_suite(ctx: &TestContext) -> SuiteReport {
    SuiteReport {
        outcomes: build_cases(ctx).iter().map(TestCase::run).collect(),
    }
}
