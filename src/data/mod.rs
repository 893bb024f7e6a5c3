//! Dataset access: the caching provider and the synthetic data generator.

pub mod provider;
pub mod simulate;

pub use provider::{DataError, Dataset, DatasetProvider};
pub use simulate::{SimulatedTable, SimulationConfig, simulate};
