//! Input/output helpers.
//!
//! - CSV dataset tables (`table`)
//! - reference file parsing (`reference`) and writing (`emit`)
//! - harness configuration (`config`)
//! - outcome exports (JSON) (`export`)

pub mod config;
pub mod emit;
pub mod export;
pub mod reference;
pub mod table;

pub use config::load_config;
pub use emit::{reference_bundle, render_reference, write_reference};
pub use export::write_outcomes_json;
pub use reference::{ParseError, ReferenceError, load_reference, parse_reference, reference_file_name};
pub use table::{CsvTableSource, RawTable, TableSource};
