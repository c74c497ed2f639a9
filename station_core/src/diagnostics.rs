//! Rejection reports emitted by the pipeline.
//!
//! Every dropped reading is handed to an explicit `DiagnosticSink` instead of a
//! global logger, so tests can assert on exactly what was rejected and why.
//! Sinks take `&self` and must be `Sync`: categories may be cleaned in parallel.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Pipeline stage that made a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Parse,
    RangeClip,
    DateRange,
    RollingThreshold,
    DifferenceThreshold,
    GapBridge,
}

impl StageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Parse => "parse",
            StageKind::RangeClip => "range_clip",
            StageKind::DateRange => "date_range",
            StageKind::RollingThreshold => "rolling_threshold",
            StageKind::DifferenceThreshold => "difference_threshold",
            StageKind::GapBridge => "gap_bridge",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a reading was dropped, with the parameters that decided it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    OutOfRange {
        min: f64,
        max: f64,
    },
    Outlier {
        mean: f64,
        stddev: f64,
        threshold_factor: f64,
        window_size: usize,
    },
    Jump {
        last_accepted: f64,
        value_threshold: f64,
    },
    Malformed {
        error: String,
    },
    UnknownCategory,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::OutOfRange { min, max } => write!(f, "outside [{min}, {max}]"),
            RejectReason::Outlier {
                mean,
                stddev,
                threshold_factor,
                window_size,
            } => write!(
                f,
                "outside {mean:.3} ± {threshold_factor}·{stddev:.3} (window {window_size})"
            ),
            RejectReason::Jump {
                last_accepted,
                value_threshold,
            } => write!(f, "jump from {last_accepted} exceeds {value_threshold}"),
            RejectReason::Malformed { error } => write!(f, "malformed: {error}"),
            RejectReason::UnknownCategory => f.write_str("unknown category"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub stage: StageKind,
    /// Wire category name; kept as text so unknown categories can be reported.
    pub category: String,
    pub sensor: String,
    /// Position in the stage's input sequence.
    pub index: usize,
    pub timestamp: Option<DateTime<Utc>>,
    pub value: Option<f64>,
    pub reason: RejectReason,
}

pub trait DiagnosticSink: Sync {
    fn record(&self, rejection: Rejection);
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &T {
    fn record(&self, rejection: Rejection) {
        (**self).record(rejection);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&self, _rejection: Rejection) {}
}

/// Forwards rejections to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, r: Rejection) {
        tracing::info!(
            stage = %r.stage,
            category = %r.category,
            sensor = %r.sensor,
            index = r.index,
            timestamp = ?r.timestamp,
            value = ?r.value,
            reason = %r.reason,
            "reading rejected"
        );
    }
}

/// Keeps every rejection in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<Rejection>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Rejection> {
        self.lock().clone()
    }

    pub fn take(&self) -> Vec<Rejection> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, stage: StageKind) -> usize {
        self.lock().iter().filter(|r| r.stage == stage).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Rejection>> {
        // A poisoned sink still holds valid events; keep using it.
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl DiagnosticSink for CollectingSink {
    fn record(&self, rejection: Rejection) {
        self.lock().push(rejection);
    }
}

/// Writes each rejection as one JSON line to a file opened once up front.
///
/// Write failures never abort a run: the first one is logged as a warning and
/// every failure is counted.
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<File>,
    failures: AtomicUsize,
}

impl JsonLinesSink {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
            failures: AtomicUsize::new(0),
        })
    }

    /// Rejections that could not be written.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    fn write(&self, rejection: &Rejection) -> io::Result<()> {
        let line = serde_json::to_string(rejection).map_err(io::Error::from)?;
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        writeln!(file, "{line}")
    }
}

impl DiagnosticSink for JsonLinesSink {
    fn record(&self, rejection: Rejection) {
        if let Err(error) = self.write(&rejection) {
            if self.failures.fetch_add(1, Ordering::Relaxed) == 0 {
                tracing::warn!(
                    path = %self.path.display(),
                    %error,
                    "diagnostics file not writable; further rejections are dropped from it"
                );
            }
        }
    }
}

/// Sends every rejection to two sinks.
pub struct Tee<A, B>(pub A, pub B);

impl<A: DiagnosticSink, B: DiagnosticSink> DiagnosticSink for Tee<A, B> {
    fn record(&self, rejection: Rejection) {
        self.0.record(rejection.clone());
        self.1.record(rejection);
    }
}
