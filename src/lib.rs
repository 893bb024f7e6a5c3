//! `vecm-check` library crate.
//!
//! The binary (`vecm-check`) is a thin wrapper around this library so that:
//!
//! - the harness is testable without spawning processes
//! - the estimator can be swapped behind the `Estimator` trait
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod harness;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
