//! Seams between the series cleaner and its collaborators.
//!
//! The fetch collaborator hands over a [`RawBatch`]: category name to sensor
//! display name to the rows the storage layer returned, ascending by timestamp.
//! Rows are kept exactly as they arrive on the wire; parsing happens in
//! `station_core`.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// One raw row as served by the dashboard API.
///
/// Both fields are tolerant on input so one bad row never fails a batch. The
/// timestamp accepts a string or a bare number; anything else (`null`, missing,
/// an object) becomes an empty string. The value accepts a number or a numeric
/// string; anything else (`null`, missing, `"n/a"`) becomes `None`. The cleaner
/// reports such rows as data errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    #[serde(default, deserialize_with = "loose_timestamp")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "loose_value")]
    pub value: Option<f64>,
}

/// Any JSON scalar or structure, sorted into what a row field can use.
#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Text(String),
    Number(f64),
    Other(serde::de::IgnoredAny),
}

fn loose_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Loose::deserialize(d)? {
        Loose::Text(s) => s,
        Loose::Number(n) => n.to_string(),
        Loose::Other(_) => String::new(),
    })
}

fn loose_value<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Loose::deserialize(d)? {
        Loose::Text(s) => s.trim().parse().ok(),
        Loose::Number(n) => Some(n),
        Loose::Other(_) => None,
    })
}

impl RawRow {
    pub fn new(timestamp: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            value: Some(value),
        }
    }
}

/// Rows for every sensor of one category, keyed by sensor display name.
pub type RawCategory = BTreeMap<String, Vec<RawRow>>;

/// Complete fetch result, keyed by category name
/// (`temperature_celsius`, `relative_humidity_percent`, `air_pressure_pa`).
pub type RawBatch = BTreeMap<String, RawCategory>;

pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Anything that can produce a raw batch: an HTTP client, a file, a simulator.
pub trait BatchSource {
    fn fetch(&mut self) -> Result<RawBatch, SourceError>;

    /// Short human label used in logs ("file:data.json", "simulated", ...).
    fn describe(&self) -> String {
        "batch source".to_string()
    }
}

impl<T: BatchSource + ?Sized> BatchSource for Box<T> {
    fn fetch(&mut self) -> Result<RawBatch, SourceError> {
        (**self).fetch()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
