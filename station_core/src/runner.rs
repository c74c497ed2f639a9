//! Fetch-then-clean orchestration.
//!
//! A fetch failure aborts the invocation with no output. Everything after the
//! fetch is total: bad rows become diagnostics, never errors.

use std::time::Instant;

use station_traits::{BatchSource, RawBatch};

use crate::config::DateWindow;
use crate::diagnostics::DiagnosticSink;
use crate::error::{CleanError, Result};
use crate::pipeline::{CleanedBatch, Cleaner, ParsedBatch};

/// How categories are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Schedule {
    #[default]
    Sequential,
    /// One scoped worker per category.
    Parallel,
}

fn fetch<S: BatchSource + ?Sized>(source: &mut S) -> Result<RawBatch> {
    let label = source.describe();
    let t0 = Instant::now();
    let raw = source.fetch().map_err(|e| {
        tracing::error!(source = %label, error = %e, "fetch failed");
        eyre::Report::new(CleanError::Source(e.to_string()))
    })?;
    let rows: usize = raw.values().flat_map(|c| c.values()).map(Vec::len).sum();
    tracing::info!(
        source = %label,
        categories = raw.len(),
        rows,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "batch fetched"
    );
    Ok(raw)
}

/// Fetch once and clean with `cleaner`.
pub fn run<S: BatchSource + ?Sized>(
    source: &mut S,
    cleaner: &Cleaner,
    schedule: Schedule,
    sink: &dyn DiagnosticSink,
) -> Result<CleanedBatch> {
    let raw = fetch(source)?;
    Ok(CachedBatch::from_raw(raw, sink).clean(cleaner, schedule, sink))
}

/// A fetched and parsed batch that can be re-cleaned for any number of windows
/// without going back to the source.
#[derive(Debug, Clone, Default)]
pub struct CachedBatch {
    parsed: ParsedBatch,
}

impl CachedBatch {
    /// Parse diagnostics are reported once, here.
    pub fn from_raw(raw: RawBatch, sink: &dyn DiagnosticSink) -> Self {
        Self {
            parsed: Cleaner::default().parse_batch(&raw, sink),
        }
    }

    pub fn fetch_once<S: BatchSource + ?Sized>(
        source: &mut S,
        sink: &dyn DiagnosticSink,
    ) -> Result<Self> {
        let raw = fetch(source)?;
        Ok(Self::from_raw(raw, sink))
    }

    pub fn parsed(&self) -> &ParsedBatch {
        &self.parsed
    }

    pub fn clean(
        &self,
        cleaner: &Cleaner,
        schedule: Schedule,
        sink: &dyn DiagnosticSink,
    ) -> CleanedBatch {
        let t0 = Instant::now();
        let out = match schedule {
            Schedule::Sequential => cleaner.clean_parsed(&self.parsed, sink),
            Schedule::Parallel => cleaner.clean_parsed_parallel(&self.parsed, sink),
        };
        let (clipped, filtered) = out.totals();
        tracing::info!(
            categories = out.categories.len(),
            clipped,
            filtered,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "batch cleaned"
        );
        out
    }

    /// Re-clean for another date window, keeping every other parameter.
    pub fn clean_window(
        &self,
        cleaner: &Cleaner,
        window: DateWindow,
        sink: &dyn DiagnosticSink,
    ) -> CleanedBatch {
        self.clean(&cleaner.with_window(window), Schedule::Sequential, sink)
    }
}
