//! Domain types used throughout the harness.
//!
//! This module defines:
//!
//! - dataset identifiers and deterministic-term configurations
//! - coefficient blocks and the bundles/tables that hold them
//! - the harness configuration (`HarnessConfig`, `DatasetSpec`, `Tolerance`)

pub mod types;

pub use types::*;
