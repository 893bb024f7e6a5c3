//! Model fitting driver.
//!
//! Responsibilities:
//!
//! - build one `FitRequest` per configured deterministic-term setting
//! - fit every (dataset, configuration) pair (parallel)
//! - publish the fitted blocks as a `ResultTable`

pub mod driver;

pub use driver::*;
