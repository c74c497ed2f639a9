//! Runtime configuration types for the cleaning pipeline.
//!
//! These are the structs `Cleaner` works with. They are separate from the
//! TOML-deserialized config in `station_config`; see `conversions`.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::error::BuildError;
use crate::reading::{Category, parse_timestamp};

/// Optional date restriction; an absent bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateWindow {
    pub fn new(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Self, BuildError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(BuildError::InvertedWindow);
            }
        }
        Ok(Self { start, end })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Build from optional ISO-8601 strings (same forms as reading timestamps).
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, BuildError> {
        let parse = |s: &str| {
            parse_timestamp(s).map_err(|_| BuildError::InvalidWindowBound(s.to_string()))
        };
        let start = start.map(parse).transpose()?;
        let end = end.map(parse).transpose()?;
        Self::new(start, end)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Inclusive on both ends.
    #[inline]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start.is_none_or(|s| ts >= s) && self.end.is_none_or(|e| ts <= e)
    }
}

/// Plausible bounds for a sensor; values outside are hardware faults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalRange {
    pub min: f64,
    pub max: f64,
}

impl PhysicalRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// First matching rule wins. `sensor` is a lowercase substring of the sensor name.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeRule {
    pub sensor: Option<String>,
    pub category: Category,
    pub range: PhysicalRange,
}

impl RangeRule {
    pub fn new(sensor: Option<&str>, category: Category, min: f64, max: f64) -> Self {
        Self {
            sensor: sensor.map(str::to_lowercase),
            category,
            range: PhysicalRange::new(min, max),
        }
    }

    fn matches(&self, category: Category, sensor_lower: &str) -> bool {
        self.category == category
            && self
                .sensor
                .as_deref()
                .is_none_or(|pat| sensor_lower.contains(pat))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeTable {
    rules: Vec<RangeRule>,
}

impl Default for RangeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RangeTable {
    pub fn builtin() -> Self {
        Self {
            rules: catalog::builtin_range_rules(),
        }
    }

    /// User rules are checked before the built-in table.
    pub fn with_overrides(overrides: Vec<RangeRule>) -> Self {
        let mut rules = overrides;
        rules.extend(catalog::builtin_range_rules());
        Self { rules }
    }

    pub fn rules(&self) -> &[RangeRule] {
        &self.rules
    }

    pub fn resolve(&self, category: Category, sensor: &str) -> PhysicalRange {
        let lower = sensor.to_lowercase();
        self.rules
            .iter()
            .find(|r| r.matches(category, &lower))
            .map_or_else(|| catalog::default_range(category), |r| r.range)
    }
}

/// A value per measurement category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ByCategory<T> {
    pub temperature: T,
    pub humidity: T,
    pub pressure: T,
}

impl<T: Copy> ByCategory<T> {
    pub fn get(&self, category: Category) -> T {
        match category {
            Category::Temperature => self.temperature,
            Category::Humidity => self.humidity,
            Category::Pressure => self.pressure,
        }
    }
}

/// Which outlier strategy runs on the filtered branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutlierKind {
    #[default]
    Rolling,
    Difference,
    Disabled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlierCfg {
    pub kind: OutlierKind,
    /// Centered window length (odd); shrinks at the series edges.
    pub window_size: usize,
    /// Rolling: keep values within mean ± factor * stddev.
    pub threshold_factor: ByCategory<f64>,
    /// Difference: max jump from the last accepted value.
    pub value_threshold: ByCategory<f64>,
}

impl Default for OutlierCfg {
    fn default() -> Self {
        Self {
            kind: OutlierKind::Rolling,
            window_size: 5,
            threshold_factor: ByCategory {
                temperature: 1.0,
                humidity: 0.5,
                pressure: 1.0,
            },
            value_threshold: ByCategory {
                temperature: 5.0,
                humidity: 10.0,
                pressure: 500.0,
            },
        }
    }
}

/// Everything the pipeline needs apart from the date window.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanerCfg {
    pub outlier: OutlierCfg,
    /// Gap bridging threshold. Default: 30 minutes.
    pub max_gap: TimeDelta,
    /// Keep the reading just outside the window next to an in-window one.
    pub keep_boundary_neighbor: bool,
    pub ranges: RangeTable,
}

impl Default for CleanerCfg {
    fn default() -> Self {
        Self {
            outlier: OutlierCfg::default(),
            max_gap: TimeDelta::minutes(30),
            keep_boundary_neighbor: true,
            ranges: RangeTable::builtin(),
        }
    }
}
