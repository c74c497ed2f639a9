//! Bridges from `station_config` (TOML shape) to the runtime types here.

use chrono::TimeDelta;
use eyre::WrapErr;

use crate::config::{
    ByCategory, CleanerCfg, DateWindow, OutlierCfg, OutlierKind, RangeRule, RangeTable,
};
use crate::error::Result;
use crate::pipeline::Cleaner;
use crate::reading::Category;

// ── Outlier ──────────────────────────────────────────────────────────────────

impl From<station_config::OutlierStrategy> for OutlierKind {
    fn from(s: station_config::OutlierStrategy) -> Self {
        match s {
            station_config::OutlierStrategy::Rolling => Self::Rolling,
            station_config::OutlierStrategy::Difference => Self::Difference,
            station_config::OutlierStrategy::None => Self::Disabled,
        }
    }
}

impl From<&station_config::PerCategory> for ByCategory<f64> {
    fn from(c: &station_config::PerCategory) -> Self {
        Self {
            temperature: c.temperature_celsius,
            humidity: c.relative_humidity_percent,
            pressure: c.air_pressure_pa,
        }
    }
}

impl From<&station_config::OutlierCfg> for OutlierCfg {
    fn from(c: &station_config::OutlierCfg) -> Self {
        Self {
            kind: c.strategy.into(),
            window_size: c.window_size,
            threshold_factor: (&c.threshold_factor).into(),
            value_threshold: (&c.value_threshold).into(),
        }
    }
}

// ── Ranges ───────────────────────────────────────────────────────────────────

impl TryFrom<&station_config::RangeRuleCfg> for RangeRule {
    type Error = crate::error::CleanError;

    fn try_from(c: &station_config::RangeRuleCfg) -> std::result::Result<Self, Self::Error> {
        let category: Category = c.category.parse()?;
        Ok(RangeRule::new(c.sensor.as_deref(), category, c.min, c.max))
    }
}

// ── Whole config ─────────────────────────────────────────────────────────────

impl TryFrom<&station_config::Config> for CleanerCfg {
    type Error = eyre::Report;

    fn try_from(c: &station_config::Config) -> Result<Self> {
        let overrides = c
            .ranges
            .iter()
            .map(RangeRule::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()
            .wrap_err("invalid [[ranges]] entry")?;
        let minutes = i64::try_from(c.gaps.max_gap_minutes)
            .wrap_err("gaps.max_gap_minutes out of range")?;
        Ok(Self {
            outlier: (&c.outlier).into(),
            max_gap: TimeDelta::minutes(minutes),
            keep_boundary_neighbor: c.window.keep_boundary_neighbor,
            ranges: RangeTable::with_overrides(overrides),
        })
    }
}

impl TryFrom<&station_config::Config> for DateWindow {
    type Error = eyre::Report;

    fn try_from(c: &station_config::Config) -> Result<Self> {
        DateWindow::parse(c.window.start.as_deref(), c.window.end.as_deref())
            .map_err(eyre::Report::new)
    }
}

impl TryFrom<&station_config::Config> for Cleaner {
    type Error = eyre::Report;

    /// Converts and validates; the config's own `validate()` is not required first.
    fn try_from(c: &station_config::Config) -> Result<Self> {
        Cleaner::builder()
            .with_cfg(CleanerCfg::try_from(c)?)
            .with_window(DateWindow::try_from(c)?)
            .build()
    }
}
