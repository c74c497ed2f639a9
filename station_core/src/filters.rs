//! Keep/drop strategies and the ordered stage list.
//!
//! Each filter is a parameterized value implementing `ReadingPredicate`. The
//! predicate sees the whole input (neighbors, windows) and the output accepted
//! so far (sequential strategies), and never mutates either. `retain_with`
//! drives a predicate over a series and reports drops to the sink.

use crate::config::{DateWindow, PhysicalRange};
use crate::diagnostics::{DiagnosticSink, RejectReason, Rejection, StageKind};
use crate::gaps::GapBridge;
use crate::reading::Reading;
use crate::util::{approx_eq, centered_window, mean_and_sample_stddev, tolerance};

/// Outcome of a single keep/drop decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Keep,
    /// Dropped as implausible; reported to the diagnostics sink.
    Reject(RejectReason),
    /// Dropped because it is out of view (date window); not a data problem.
    Exclude,
}

pub trait ReadingPredicate {
    fn stage(&self) -> StageKind;

    /// Decide for `series[index]`. `accepted` is this stage's output so far.
    fn keep(&self, index: usize, series: &[Reading], accepted: &[Reading]) -> Verdict;
}

/// Who a series belongs to, and where its rejections go.
#[derive(Clone, Copy)]
pub struct SeriesContext<'a> {
    pub category: &'a str,
    pub sensor: &'a str,
    pub sink: &'a dyn DiagnosticSink,
}

impl<'a> SeriesContext<'a> {
    pub fn new(category: &'a str, sensor: &'a str, sink: &'a dyn DiagnosticSink) -> Self {
        Self {
            category,
            sensor,
            sink,
        }
    }

    pub fn reject(&self, stage: StageKind, index: usize, reading: &Reading, reason: RejectReason) {
        self.sink.record(Rejection {
            stage,
            category: self.category.to_string(),
            sensor: self.sensor.to_string(),
            index,
            timestamp: Some(reading.timestamp),
            value: Some(reading.value),
            reason,
        });
    }
}

impl core::fmt::Debug for SeriesContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SeriesContext")
            .field("category", &self.category)
            .field("sensor", &self.sensor)
            .finish_non_exhaustive()
    }
}

/// Apply `pred` to every reading in order and return the kept ones.
pub fn retain_with<P: ReadingPredicate + ?Sized>(
    pred: &P,
    series: &[Reading],
    ctx: &SeriesContext<'_>,
) -> Vec<Reading> {
    let mut out = Vec::with_capacity(series.len());
    let mut excluded = 0usize;
    for (i, r) in series.iter().enumerate() {
        match pred.keep(i, series, &out) {
            Verdict::Keep => out.push(*r),
            Verdict::Reject(reason) => ctx.reject(pred.stage(), i, r, reason),
            Verdict::Exclude => excluded += 1,
        }
    }
    if excluded > 0 {
        tracing::debug!(
            stage = %pred.stage(),
            category = ctx.category,
            sensor = ctx.sensor,
            excluded,
            "readings outside view"
        );
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeClip {
    pub range: PhysicalRange,
}

impl ReadingPredicate for RangeClip {
    fn stage(&self) -> StageKind {
        StageKind::RangeClip
    }

    fn keep(&self, index: usize, series: &[Reading], _accepted: &[Reading]) -> Verdict {
        if self.range.contains(series[index].value) {
            Verdict::Keep
        } else {
            Verdict::Reject(RejectReason::OutOfRange {
                min: self.range.min,
                max: self.range.max,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateRange {
    pub window: DateWindow,
    /// Also keep an outside reading whose positional neighbor is inside.
    pub keep_boundary_neighbor: bool,
}

impl ReadingPredicate for DateRange {
    fn stage(&self) -> StageKind {
        StageKind::DateRange
    }

    fn keep(&self, index: usize, series: &[Reading], _accepted: &[Reading]) -> Verdict {
        let inside = |j: usize| self.window.contains(series[j].timestamp);
        if inside(index) {
            return Verdict::Keep;
        }
        if self.keep_boundary_neighbor
            && ((index > 0 && inside(index - 1)) || (index + 1 < series.len() && inside(index + 1)))
        {
            return Verdict::Keep;
        }
        Verdict::Exclude
    }
}

/// Local outlier rejection over a centered window.
///
/// With no spread in the window (one element, or all equal) a value passes
/// only if it equals the window mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingThreshold {
    pub window_size: usize,
    pub threshold_factor: f64,
}

impl ReadingPredicate for RollingThreshold {
    fn stage(&self) -> StageKind {
        StageKind::RollingThreshold
    }

    fn keep(&self, index: usize, series: &[Reading], _accepted: &[Reading]) -> Verdict {
        let (lo, hi) = centered_window(index, self.window_size, series.len());
        let Some((mean, stddev)) = mean_and_sample_stddev(series[lo..hi].iter().map(|r| r.value))
        else {
            return Verdict::Keep;
        };
        let v = series[index].value;
        let ok = if stddev.is_finite() && stddev > 0.0 {
            // A value exactly on the bound stays, whatever the rounding.
            (v - mean).abs() <= self.threshold_factor * stddev + tolerance(mean)
        } else {
            approx_eq(v, mean)
        };
        if ok {
            Verdict::Keep
        } else {
            Verdict::Reject(RejectReason::Outlier {
                mean,
                stddev,
                threshold_factor: self.threshold_factor,
                window_size: self.window_size,
            })
        }
    }
}

/// Legacy strategy: bound the jump from the last accepted value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifferenceThreshold {
    pub value_threshold: f64,
}

impl ReadingPredicate for DifferenceThreshold {
    fn stage(&self) -> StageKind {
        StageKind::DifferenceThreshold
    }

    fn keep(&self, index: usize, series: &[Reading], accepted: &[Reading]) -> Verdict {
        let Some(last) = accepted.last() else {
            return Verdict::Keep;
        };
        if (series[index].value - last.value).abs() <= self.value_threshold {
            Verdict::Keep
        } else {
            Verdict::Reject(RejectReason::Jump {
                last_accepted: last.value,
                value_threshold: self.value_threshold,
            })
        }
    }
}

/// One step of a per-series pipeline, as a tagged configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    RangeClip(RangeClip),
    DateRange(DateRange),
    GapBridge(GapBridge),
    Rolling(RollingThreshold),
    Difference(DifferenceThreshold),
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::RangeClip(p) => p.stage(),
            Stage::DateRange(p) => p.stage(),
            Stage::GapBridge(_) => StageKind::GapBridge,
            Stage::Rolling(p) => p.stage(),
            Stage::Difference(p) => p.stage(),
        }
    }

    pub fn apply(&self, series: &[Reading], ctx: &SeriesContext<'_>) -> Vec<Reading> {
        match self {
            Stage::RangeClip(p) => retain_with(p, series, ctx),
            Stage::DateRange(p) => {
                if p.window.is_unbounded() {
                    series.to_vec()
                } else {
                    retain_with(p, series, ctx)
                }
            }
            Stage::GapBridge(g) => g.apply(series),
            Stage::Rolling(p) => retain_with(p, series, ctx),
            Stage::Difference(p) => retain_with(p, series, ctx),
        }
    }
}

/// Run `stages` in order, each on the previous stage's full output.
pub fn run_stages(stages: &[Stage], series: &[Reading], ctx: &SeriesContext<'_>) -> Vec<Reading> {
    let mut current = series.to_vec();
    for stage in stages {
        current = stage.apply(&current, ctx);
    }
    current
}
