//! Builder for `Cleaner`.
//!
//! Every setter is optional; `build()` fills in defaults and validates the
//! combination once, so a built `Cleaner` never has to re-check parameters.

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::{CleanerCfg, DateWindow, OutlierCfg, RangeTable};
use crate::error::{BuildError, Result};
use crate::pipeline::Cleaner;

#[derive(Debug, Default)]
pub struct CleanerBuilder {
    cfg: Option<CleanerCfg>,
    outlier: Option<OutlierCfg>,
    max_gap: Option<TimeDelta>,
    keep_boundary_neighbor: Option<bool>,
    ranges: Option<RangeTable>,
    window: Option<DateWindow>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl CleanerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a complete config; later setters override single fields.
    pub fn with_cfg(mut self, cfg: CleanerCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    pub fn with_outlier(mut self, outlier: OutlierCfg) -> Self {
        self.outlier = Some(outlier);
        self
    }

    pub fn with_max_gap(mut self, max_gap: TimeDelta) -> Self {
        self.max_gap = Some(max_gap);
        self
    }

    pub fn keep_boundary_neighbor(mut self, keep: bool) -> Self {
        self.keep_boundary_neighbor = Some(keep);
        self
    }

    pub fn with_ranges(mut self, ranges: RangeTable) -> Self {
        self.ranges = Some(ranges);
        self
    }

    pub fn with_window(mut self, window: DateWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Overrides the start bound of any window set so far.
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Overrides the end bound of any window set so far.
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn build(self) -> Result<Cleaner> {
        let mut cfg = self.cfg.unwrap_or_default();
        if let Some(o) = self.outlier {
            cfg.outlier = o;
        }
        if let Some(g) = self.max_gap {
            cfg.max_gap = g;
        }
        if let Some(k) = self.keep_boundary_neighbor {
            cfg.keep_boundary_neighbor = k;
        }
        if let Some(r) = self.ranges {
            cfg.ranges = r;
        }
        let base = self.window.unwrap_or_default();
        let window = DateWindow::new(self.start.or(base.start), self.end.or(base.end))
            .map_err(eyre::Report::new)?;
        validate_and_build(cfg, window)
    }
}

/// Single source of truth for parameter validation.
fn validate_and_build(cfg: CleanerCfg, window: DateWindow) -> Result<Cleaner> {
    // ── Validation ───────────────────────────────────────────────────────────
    if cfg.outlier.window_size == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "window_size must be >= 1",
        )));
    }
    if cfg.outlier.window_size % 2 == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "window_size must be odd",
        )));
    }
    for c in crate::reading::Category::ALL {
        let f = cfg.outlier.threshold_factor.get(c);
        if !(f.is_finite() && f > 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "threshold_factor must be finite and > 0",
            )));
        }
        let t = cfg.outlier.value_threshold.get(c);
        if !(t.is_finite() && t > 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "value_threshold must be finite and > 0",
            )));
        }
    }
    if cfg.max_gap <= TimeDelta::zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "max_gap must be > 0",
        )));
    }
    for rule in cfg.ranges.rules() {
        if !(rule.range.min.is_finite() && rule.range.max.is_finite())
            || rule.range.min > rule.range.max
        {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "range bounds must be finite with min <= max",
            )));
        }
    }

    Ok(Cleaner::from_parts(cfg, window))
}
