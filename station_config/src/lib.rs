#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and raw-batch loaders for the weather-station cleaner.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Batch JSON and single-series CSV loaders produce `station_traits` rows
//!   without interpreting timestamps; that is the cleaner's job.
use serde::Deserialize;
use station_traits::{RawBatch, RawRow};

/// Single-series CSV schema.
///
/// Expected headers:
/// timestamp,value
///
/// Example:
/// timestamp,value
/// 2024-11-20T12:00:00,21.4
/// 2024-11-20T12:05:00,21.5
#[derive(Debug, Deserialize, Clone)]
pub struct SeriesRow {
    pub timestamp: String,
    pub value: Option<f64>,
}

impl From<SeriesRow> for RawRow {
    fn from(r: SeriesRow) -> Self {
        RawRow {
            timestamp: r.timestamp,
            value: r.value,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutlierStrategy {
    #[default]
    Rolling,
    Difference,
    None,
}

/// One number per measurement category, keyed by the wire category names.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct PerCategory {
    pub temperature_celsius: f64,
    pub relative_humidity_percent: f64,
    pub air_pressure_pa: f64,
}

impl PerCategory {
    pub fn iter(&self) -> [(&'static str, f64); 3] {
        [
            ("temperature_celsius", self.temperature_celsius),
            ("relative_humidity_percent", self.relative_humidity_percent),
            ("air_pressure_pa", self.air_pressure_pa),
        ]
    }
}

fn default_threshold_factor() -> PerCategory {
    PerCategory {
        temperature_celsius: 1.0,
        relative_humidity_percent: 0.5,
        air_pressure_pa: 1.0,
    }
}

fn default_value_threshold() -> PerCategory {
    PerCategory {
        temperature_celsius: 5.0,
        relative_humidity_percent: 10.0,
        air_pressure_pa: 500.0,
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutlierCfg {
    pub strategy: OutlierStrategy,
    /// Centered rolling window length in samples; must be odd.
    pub window_size: usize,
    /// Rolling strategy: keep values within mean ± factor * stddev.
    #[serde(default = "default_threshold_factor")]
    pub threshold_factor: PerCategory,
    /// Difference strategy: max jump from the last accepted value.
    #[serde(default = "default_value_threshold")]
    pub value_threshold: PerCategory,
}

impl Default for OutlierCfg {
    fn default() -> Self {
        Self {
            strategy: OutlierStrategy::Rolling,
            window_size: 5,
            threshold_factor: default_threshold_factor(),
            value_threshold: default_value_threshold(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GapsCfg {
    /// Consecutive readings further apart than this get a held-value point.
    pub max_gap_minutes: u64,
}

impl Default for GapsCfg {
    fn default() -> Self {
        Self {
            max_gap_minutes: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowCfg {
    /// Keep the reading just outside the window next to an in-window reading.
    pub keep_boundary_neighbor: bool,
    /// Optional ISO-8601 lower bound; parsed by the cleaner.
    pub start: Option<String>,
    /// Optional ISO-8601 upper bound; parsed by the cleaner.
    pub end: Option<String>,
}

impl Default for WindowCfg {
    fn default() -> Self {
        Self {
            keep_boundary_neighbor: true,
            start: None,
            end: None,
        }
    }
}

/// Physical range override, checked before the built-in sensor table.
#[derive(Debug, Deserialize, Clone)]
pub struct RangeRuleCfg {
    /// Case-insensitive substring of the sensor name; absent matches any sensor.
    #[serde(default)]
    pub sensor: Option<String>,
    pub category: String,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub outlier: OutlierCfg,
    pub gaps: GapsCfg,
    pub window: WindowCfg,
    pub ranges: Vec<RangeRuleCfg>,
    pub logging: Logging,
}

pub const CATEGORY_NAMES: [&str; 3] = [
    "temperature_celsius",
    "relative_humidity_percent",
    "air_pressure_pa",
];

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_config_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Outlier
        if self.outlier.window_size == 0 {
            eyre::bail!("outlier.window_size must be >= 1");
        }
        if self.outlier.window_size % 2 == 0 {
            eyre::bail!("outlier.window_size must be odd");
        }
        if self.outlier.window_size > 1001 {
            eyre::bail!("outlier.window_size is unreasonably large (>1001)");
        }
        for (name, f) in self.outlier.threshold_factor.iter() {
            if !(f.is_finite() && f > 0.0) {
                eyre::bail!("outlier.threshold_factor.{name} must be finite and > 0");
            }
        }
        for (name, t) in self.outlier.value_threshold.iter() {
            if !(t.is_finite() && t > 0.0) {
                eyre::bail!("outlier.value_threshold.{name} must be finite and > 0");
            }
        }

        // Gaps
        if self.gaps.max_gap_minutes == 0 {
            eyre::bail!("gaps.max_gap_minutes must be >= 1");
        }
        if self.gaps.max_gap_minutes > 366 * 24 * 60 {
            eyre::bail!("gaps.max_gap_minutes is unreasonably large (>1 year)");
        }

        // Ranges
        for (i, r) in self.ranges.iter().enumerate() {
            if !CATEGORY_NAMES.contains(&r.category.as_str()) {
                eyre::bail!(
                    "ranges[{i}].category must be one of {}, got '{}'",
                    CATEGORY_NAMES.join(", "),
                    r.category
                );
            }
            if !(r.min.is_finite() && r.max.is_finite()) {
                eyre::bail!("ranges[{i}] bounds must be finite");
            }
            if r.min > r.max {
                eyre::bail!("ranges[{i}].min must be <= max");
            }
            if r.sensor.as_deref().is_some_and(|s| s.trim().is_empty()) {
                eyre::bail!("ranges[{i}].sensor must not be empty when set");
            }
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref() {
            if !matches!(rot, "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never, daily, hourly");
            }
        }

        // Window bounds are parsed (and ordered) by the cleaner, which owns timestamp formats.
        Ok(())
    }
}

/// Parse a batch JSON document: `{ category: { sensor: [ {timestamp, value}, ... ] } }`.
pub fn parse_batch_json(s: &str) -> eyre::Result<RawBatch> {
    serde_json::from_str::<RawBatch>(s).map_err(|e| eyre::eyre!("invalid batch JSON: {}", e))
}

pub fn load_batch_json(path: &std::path::Path) -> eyre::Result<RawBatch> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("open batch JSON {:?}: {}", path, e))?;
    parse_batch_json(&text).map_err(|e| eyre::eyre!("{:?}: {}", path, e))
}

pub fn load_series_csv(path: &std::path::Path) -> eyre::Result<Vec<RawRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open series CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["timestamp", "value"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "series CSV must have headers 'timestamp,value', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<SeriesRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(RawRow::from(row)),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    Ok(rows)
}
