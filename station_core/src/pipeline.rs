//! The series cleaner.
//!
//! Per sensor the stages run strictly in order, each on the previous stage's
//! complete output:
//!
//! ```text
//! raw rows -> parse -> range clip -> date range            = clipped
//!                       clipped -> gap bridge -> outlier    = filtered (per sensor)
//!                                  ^-----------'  until the outlier stage rejects nothing
//!                       filtered -> right-edge extension    = filtered (per category)
//! ```
//!
//! Repeating bridge and outlier stages until they settle makes a second pass
//! over a sensor's filtered series a no-op: every gap a rejection opened is
//! already bridged, and no reading left would be rejected.
//!
//! Sensors never share statistics; only the right-edge extension looks across
//! the sensors of one category.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use station_traits::{RawBatch, RawRow};

use crate::builder::CleanerBuilder;
use crate::config::{CleanerCfg, DateWindow, OutlierKind};
use crate::diagnostics::{CollectingSink, DiagnosticSink, RejectReason, Rejection, StageKind};
use crate::filters::{
    DateRange, DifferenceThreshold, RangeClip, RollingThreshold, SeriesContext, Stage, run_stages,
};
use crate::gaps::{GapBridge, extend_to, latest_timestamp};
use crate::reading::{Category, Reading, SeriesPair};

/// Parsed readings per category and sensor.
pub type ParsedBatch = BTreeMap<Category, BTreeMap<String, Vec<Reading>>>;

/// Pipeline output handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanedBatch {
    /// The window the series were cut to.
    pub window: DateWindow,
    pub categories: BTreeMap<Category, BTreeMap<String, SeriesPair>>,
}

impl CleanedBatch {
    pub fn series(&self, category: Category, sensor: &str) -> Option<&SeriesPair> {
        self.categories.get(&category)?.get(sensor)
    }

    /// The filtered branch only, in the shape the cleaner accepts.
    pub fn filtered(&self) -> ParsedBatch {
        self.categories
            .iter()
            .map(|(c, sensors)| {
                let inner = sensors
                    .iter()
                    .map(|(name, pair)| (name.clone(), pair.filtered.clone()))
                    .collect();
                (*c, inner)
            })
            .collect()
    }

    /// Total readings as `(clipped, filtered)`.
    pub fn totals(&self) -> (usize, usize) {
        self.categories
            .values()
            .flat_map(|s| s.values())
            .fold((0, 0), |(c, f), p| (c + p.clipped.len(), f + p.filtered.len()))
    }
}

/// Stateless cleaner: configuration plus the active date window.
#[derive(Debug, Clone, PartialEq)]
pub struct Cleaner {
    cfg: CleanerCfg,
    window: DateWindow,
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::from_parts(CleanerCfg::default(), DateWindow::unbounded())
    }
}

impl Cleaner {
    pub fn builder() -> CleanerBuilder {
        CleanerBuilder::new()
    }

    pub(crate) fn from_parts(cfg: CleanerCfg, window: DateWindow) -> Self {
        Self { cfg, window }
    }

    pub fn cfg(&self) -> &CleanerCfg {
        &self.cfg
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    /// Same parameters, different window (e.g. after a date-picker change).
    pub fn with_window(&self, window: DateWindow) -> Self {
        Self {
            cfg: self.cfg.clone(),
            window,
        }
    }

    /// Stages producing the clipped branch.
    pub fn clipped_stages(&self, category: Category, sensor: &str) -> Vec<Stage> {
        vec![
            Stage::RangeClip(RangeClip {
                range: self.cfg.ranges.resolve(category, sensor),
            }),
            Stage::DateRange(DateRange {
                window: self.window,
                keep_boundary_neighbor: self.cfg.keep_boundary_neighbor,
            }),
        ]
    }

    fn gap_bridge(&self) -> GapBridge {
        GapBridge::new(self.cfg.max_gap).within(self.window)
    }

    fn outlier_stage(&self, category: Category) -> Option<Stage> {
        let o = &self.cfg.outlier;
        match o.kind {
            OutlierKind::Rolling => Some(Stage::Rolling(RollingThreshold {
                window_size: o.window_size,
                threshold_factor: o.threshold_factor.get(category),
            })),
            OutlierKind::Difference => Some(Stage::Difference(DifferenceThreshold {
                value_threshold: o.value_threshold.get(category),
            })),
            OutlierKind::Disabled => None,
        }
    }

    /// Stages turning a clipped series into a filtered one (before edge
    /// extension). `clean_series` repeats them until the outlier stage settles.
    pub fn filtered_stages(&self, category: Category) -> Vec<Stage> {
        let mut stages = vec![Stage::GapBridge(self.gap_bridge())];
        stages.extend(self.outlier_stage(category));
        stages
    }

    /// Bridge, reject outliers, re-bridge the gaps the rejections opened, and
    /// repeat until the outlier stage keeps everything.
    fn settle(
        &self,
        category: Category,
        clipped: &[Reading],
        ctx: &SeriesContext<'_>,
    ) -> Vec<Reading> {
        let bridge = self.gap_bridge();
        let mut current = bridge.apply(clipped);
        let Some(outlier) = self.outlier_stage(category) else {
            return current;
        };
        // Bounded by the readings there are to lose.
        for round in 0..=clipped.len() {
            let rejected = CollectingSink::new();
            let kept = outlier.apply(
                &current,
                &SeriesContext::new(ctx.category, ctx.sensor, &rejected),
            );
            if kept.len() == current.len() {
                break;
            }
            let next = bridge.apply(&kept);
            // Only held points were rejected, and the bridge puts them back.
            if next == current {
                break;
            }
            tracing::trace!(
                category = ctx.category,
                sensor = ctx.sensor,
                round,
                rejected = rejected.len(),
                "outlier round"
            );
            for r in rejected.take() {
                ctx.sink.record(r);
            }
            current = next;
        }
        current
    }

    /// Parse raw rows; malformed rows are reported and skipped.
    pub fn parse_rows(
        &self,
        category: &str,
        sensor: &str,
        rows: &[RawRow],
        sink: &dyn DiagnosticSink,
    ) -> Vec<Reading> {
        let mut out = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            match Reading::try_from(row) {
                Ok(r) => out.push(r),
                Err(e) => sink.record(Rejection {
                    stage: StageKind::Parse,
                    category: category.to_string(),
                    sensor: sensor.to_string(),
                    index: i,
                    timestamp: None,
                    value: row.value,
                    reason: RejectReason::Malformed {
                        error: e.to_string(),
                    },
                }),
            }
        }
        out
    }

    /// Parse a whole batch. Rows under unknown categories are reported and skipped.
    pub fn parse_batch(&self, batch: &RawBatch, sink: &dyn DiagnosticSink) -> ParsedBatch {
        let mut parsed = ParsedBatch::new();
        for (cat_name, sensors) in batch {
            let Ok(category) = cat_name.parse::<Category>() else {
                tracing::warn!(category = %cat_name, "skipping unknown category");
                for (sensor, rows) in sensors {
                    for (i, row) in rows.iter().enumerate() {
                        sink.record(Rejection {
                            stage: StageKind::Parse,
                            category: cat_name.clone(),
                            sensor: sensor.clone(),
                            index: i,
                            timestamp: None,
                            value: row.value,
                            reason: RejectReason::UnknownCategory,
                        });
                    }
                }
                continue;
            };
            let entry = parsed.entry(category).or_default();
            for (sensor, rows) in sensors {
                entry.insert(
                    sensor.clone(),
                    self.parse_rows(cat_name, sensor, rows, sink),
                );
            }
        }
        parsed
    }

    /// Clipped and filtered series for one sensor, before edge extension.
    pub fn clean_series(
        &self,
        category: Category,
        sensor: &str,
        readings: &[Reading],
        sink: &dyn DiagnosticSink,
    ) -> SeriesPair {
        let ctx = SeriesContext::new(category.as_str(), sensor, sink);
        let clipped = run_stages(&self.clipped_stages(category, sensor), readings, &ctx);
        let mut filtered = self.settle(category, &clipped, &ctx);
        // Boundary neighbors only make sense next to something in view.
        if !filtered.iter().any(|r| self.window.contains(r.timestamp)) {
            filtered.clear();
        }
        SeriesPair { clipped, filtered }
    }

    /// All sensors of one category, with filtered series aligned on the right edge.
    pub fn clean_category(
        &self,
        category: Category,
        sensors: &BTreeMap<String, Vec<Reading>>,
        sink: &dyn DiagnosticSink,
    ) -> BTreeMap<String, SeriesPair> {
        let mut pairs: BTreeMap<String, SeriesPair> = sensors
            .iter()
            .map(|(name, readings)| {
                (
                    name.clone(),
                    self.clean_series(category, name, readings, sink),
                )
            })
            .collect();

        if let Some(latest) = latest_timestamp(pairs.values().map(|p| p.filtered.as_slice())) {
            for p in pairs.values_mut() {
                p.filtered = extend_to(&p.filtered, latest);
            }
        }

        let input: usize = sensors.values().map(Vec::len).sum();
        let (clipped, filtered) = pairs.values().fold((0, 0), |(c, f), p| {
            (c + p.clipped.len(), f + p.filtered.len())
        });
        tracing::debug!(
            category = %category,
            sensors = pairs.len(),
            input,
            clipped,
            filtered,
            "category cleaned"
        );
        pairs
    }

    pub fn clean_parsed(&self, parsed: &ParsedBatch, sink: &dyn DiagnosticSink) -> CleanedBatch {
        let categories = parsed
            .iter()
            .map(|(c, sensors)| (*c, self.clean_category(*c, sensors, sink)))
            .collect();
        CleanedBatch {
            window: self.window,
            categories,
        }
    }

    /// Like `clean_parsed`, one worker thread per category.
    pub fn clean_parsed_parallel(
        &self,
        parsed: &ParsedBatch,
        sink: &dyn DiagnosticSink,
    ) -> CleanedBatch {
        let (tx, rx) = crossbeam_channel::unbounded();
        std::thread::scope(|scope| {
            for (category, sensors) in parsed {
                let tx = tx.clone();
                scope.spawn(move || {
                    let pairs = self.clean_category(*category, sensors, sink);
                    // Receiver outlives the scope; a failed send cannot happen here.
                    let _ = tx.send((*category, pairs));
                });
            }
        });
        drop(tx);
        CleanedBatch {
            window: self.window,
            categories: rx.into_iter().collect(),
        }
    }

    pub fn clean_batch(&self, batch: &RawBatch, sink: &dyn DiagnosticSink) -> CleanedBatch {
        let parsed = self.parse_batch(batch, sink);
        self.clean_parsed(&parsed, sink)
    }

    pub fn clean_batch_parallel(&self, batch: &RawBatch, sink: &dyn DiagnosticSink) -> CleanedBatch {
        let parsed = self.parse_batch(batch, sink);
        self.clean_parsed_parallel(&parsed, sink)
    }
}
