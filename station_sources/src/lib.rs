#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `BatchSource` implementations: files, memory and a simulated station.

pub mod error;
pub mod file;
pub mod memory;
pub mod sim;

pub use error::SourceFault;
pub use file::{CsvSeriesSource, JsonFileSource};
pub use memory::MemorySource;
pub use sim::{SimConfig, SimulatedStation};
