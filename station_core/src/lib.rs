#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Weather-station series cleaning (I/O-free).
//!
//! This crate turns raw per-sensor readings into the two series a chart
//! renders: a **clipped** series (physically plausible, inside the date window)
//! and a **filtered** series (clipped, gaps bridged, local outliers removed,
//! right edges aligned per category). Fetching goes through
//! `station_traits::BatchSource`; rendering is somebody else's job.
//!
//! ## Architecture
//!
//! - **Readings**: timestamp parsing and the `Category` enum (`reading` module)
//! - **Configuration**: runtime parameters, date window, range table (`config`)
//! - **Filters**: keep/drop predicates and the ordered `Stage` list (`filters`)
//! - **Gaps**: gap bridging and right-edge extension (`gaps`)
//! - **Pipeline**: `Cleaner`, per series / category / batch (`pipeline`)
//! - **Diagnostics**: rejection events and sinks (`diagnostics`)
//! - **Runner**: fetch once, clean for one or many windows (`runner`)
//!
//! Every stage borrows its input and returns a new `Vec<Reading>`.

pub mod builder;
pub mod catalog;
pub mod config;
pub mod conversions;
pub mod diagnostics;
pub mod error;
pub mod filters;
pub mod gaps;
pub mod mocks;
pub mod pipeline;
pub mod reading;
pub mod runner;
pub mod util;

pub use builder::CleanerBuilder;
pub use config::{
    ByCategory, CleanerCfg, DateWindow, OutlierCfg, OutlierKind, PhysicalRange, RangeRule,
    RangeTable,
};
pub use diagnostics::{
    CollectingSink, DiagnosticSink, JsonLinesSink, NullSink, RejectReason, Rejection, StageKind,
    Tee, TracingSink,
};
pub use error::{BuildError, CleanError, Result};
pub use filters::{ReadingPredicate, SeriesContext, Stage, Verdict};
pub use pipeline::{CleanedBatch, Cleaner, ParsedBatch};
pub use reading::{Category, Reading, SeriesPair, parse_timestamp};
pub use runner::{CachedBatch, Schedule};
