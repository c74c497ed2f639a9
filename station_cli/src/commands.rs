//! Command implementations. Output goes to stdout (or `--output`), summaries
//! and logs to stderr.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Timelike, Utc};
use eyre::WrapErr;
use station_core::catalog;
use station_core::runner::{self, Schedule};
use station_core::{
    BuildError, Category, CleanedBatch, Cleaner, CollectingSink, DiagnosticSink, JsonLinesSink,
    Tee, TracingSink, parse_timestamp,
};
use station_sources::{CsvSeriesSource, JsonFileSource, SimConfig, SimulatedStation};
use station_traits::BatchSource;

use crate::cli::WindowArgs;

/// Config-derived cleaner with command-line window flags applied on top.
pub fn cleaner_for(cfg: &station_config::Config, window: &WindowArgs) -> eyre::Result<Cleaner> {
    let base = Cleaner::try_from(cfg)?;
    let mut b = Cleaner::builder()
        .with_cfg(base.cfg().clone())
        .with_window(*base.window());
    if let Some(s) = window.start.as_deref() {
        b = b.with_start(parse_bound(s)?);
    }
    if let Some(e) = window.end.as_deref() {
        b = b.with_end(parse_bound(e)?);
    }
    if window.no_boundary {
        b = b.keep_boundary_neighbor(false);
    }
    b.build()
}

fn parse_bound(raw: &str) -> eyre::Result<DateTime<Utc>> {
    parse_timestamp(raw)
        .map_err(|_| eyre::Report::new(BuildError::InvalidWindowBound(raw.to_string())))
}

fn write_output(output: Option<&Path>, body: &str) -> eyre::Result<()> {
    match output {
        Some(path) => fs::write(path, format!("{body}\n"))
            .wrap_err_with(|| format!("write output {}", path.display())),
        None => {
            let mut out = std::io::stdout().lock();
            writeln!(out, "{body}").wrap_err("write stdout")
        }
    }
}

fn summarize(out: &CleanedBatch, rejected: &CollectingSink) {
    let sensors: usize = out.categories.values().map(BTreeMap::len).sum();
    let (clipped, filtered) = out.totals();
    let mut by_stage: BTreeMap<&'static str, usize> = BTreeMap::new();
    for r in rejected.events() {
        *by_stage.entry(r.stage.as_str()).or_default() += 1;
    }
    let stages = if by_stage.is_empty() {
        "none".to_string()
    } else {
        by_stage
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    eprintln!(
        "cleaned {sensors} sensor(s): clipped={clipped} filtered={filtered}; rejected: {stages}"
    );
}

fn clean_from<S: BatchSource>(
    source: &mut S,
    cleaner: &Cleaner,
    schedule: Schedule,
    diagnostics: Option<&Path>,
    output: Option<&Path>,
) -> eyre::Result<()> {
    let rejected = CollectingSink::new();
    let base = Tee(TracingSink, &rejected);

    let file_sink = match diagnostics {
        Some(path) => Some(
            JsonLinesSink::create(path)
                .wrap_err_with(|| format!("create diagnostics file {}", path.display()))?,
        ),
        None => None,
    };
    let with_file;
    let sink: &dyn DiagnosticSink = match &file_sink {
        Some(f) => {
            with_file = Tee(&base, f);
            &with_file
        }
        None => &base,
    };

    let out = runner::run(source, cleaner, schedule, sink)?;
    let body = serde_json::to_string_pretty(&out).wrap_err("serialize cleaned batch")?;
    write_output(output, &body)?;
    summarize(&out, &rejected);
    Ok(())
}

pub fn clean(
    cfg: &station_config::Config,
    input: &Path,
    window: &WindowArgs,
    parallel: bool,
    diagnostics: Option<&Path>,
    output: Option<&Path>,
) -> eyre::Result<()> {
    let cleaner = cleaner_for(cfg, window)?;
    let schedule = if parallel {
        Schedule::Parallel
    } else {
        Schedule::Sequential
    };
    tracing::info!(input = %input.display(), ?schedule, window = ?cleaner.window(), "clean");
    clean_from(
        &mut JsonFileSource::new(input),
        &cleaner,
        schedule,
        diagnostics,
        output,
    )
}

pub fn series(
    cfg: &station_config::Config,
    csv: &Path,
    category: &str,
    sensor: &str,
    window: &WindowArgs,
    output: Option<&Path>,
) -> eyre::Result<()> {
    // Fail before reading the file.
    let category: Category = category.parse().map_err(eyre::Report::new)?;
    let cleaner = cleaner_for(cfg, window)?;
    let mut source = CsvSeriesSource::new(csv, category.as_str(), sensor);
    clean_from(&mut source, &cleaner, Schedule::Sequential, None, output)
}

pub fn sensors(json: bool) -> eyre::Result<()> {
    let entries = catalog::sensors();
    if json {
        return write_output(None, &serde_json::to_string_pretty(&entries)?);
    }
    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(format!(
        "{:<34} {:<27} {:<16} range",
        "sensor", "category", "locations"
    ));
    for e in &entries {
        let locations = e
            .locations
            .iter()
            .map(|l| match l {
                catalog::Location::Indoor => "indoor",
                catalog::Location::Outdoor => "outdoor",
            })
            .collect::<Vec<_>>()
            .join(",");
        lines.push(format!(
            "{:<34} {:<27} {:<16} [{}, {}] {}",
            e.name,
            e.category.as_str(),
            locations,
            e.range.min,
            e.range.max,
            e.category.unit()
        ));
    }
    write_output(None, &lines.join("\n"))
}

pub fn check_config(cfg: &station_config::Config, json: bool) -> eyre::Result<()> {
    let cleaner = Cleaner::try_from(cfg)?;
    let c = cleaner.cfg();
    let o = &c.outlier;
    let fmt_ts = |t: Option<DateTime<Utc>>| t.map(|t| t.to_rfc3339());

    if json {
        let ranges: Vec<_> = c
            .ranges
            .rules()
            .iter()
            .map(|r| {
                serde_json::json!({
                    "sensor": r.sensor,
                    "category": r.category,
                    "min": r.range.min,
                    "max": r.range.max,
                })
            })
            .collect();
        let factors: BTreeMap<_, _> = Category::ALL
            .iter()
            .map(|k| (k.as_str(), o.threshold_factor.get(*k)))
            .collect();
        let thresholds: BTreeMap<_, _> = Category::ALL
            .iter()
            .map(|k| (k.as_str(), o.value_threshold.get(*k)))
            .collect();
        let body = serde_json::json!({
            "outlier": {
                "strategy": format!("{:?}", o.kind).to_lowercase(),
                "window_size": o.window_size,
                "threshold_factor": factors,
                "value_threshold": thresholds,
            },
            "max_gap_minutes": c.max_gap.num_minutes(),
            "keep_boundary_neighbor": c.keep_boundary_neighbor,
            "window": {
                "start": fmt_ts(cleaner.window().start),
                "end": fmt_ts(cleaner.window().end),
            },
            "ranges": ranges,
        });
        return write_output(None, &serde_json::to_string_pretty(&body)?);
    }

    let mut lines = vec![
        "config ok".to_string(),
        format!("outlier: {:?}, window_size={}", o.kind, o.window_size),
    ];
    for k in Category::ALL {
        lines.push(format!(
            "  {:<27} threshold_factor={} value_threshold={}",
            k.as_str(),
            o.threshold_factor.get(k),
            o.value_threshold.get(k)
        ));
    }
    lines.push(format!("max_gap: {} min", c.max_gap.num_minutes()));
    lines.push(format!("keep_boundary_neighbor: {}", c.keep_boundary_neighbor));
    lines.push(format!(
        "window: {} .. {}",
        fmt_ts(cleaner.window().start).unwrap_or_else(|| "open".into()),
        fmt_ts(cleaner.window().end).unwrap_or_else(|| "open".into())
    ));
    lines.push("ranges (first match wins):".to_string());
    for r in c.ranges.rules() {
        lines.push(format!(
            "  {:<27} {:<10} [{}, {}]",
            r.category.as_str(),
            r.sensor.as_deref().unwrap_or("*"),
            r.range.min,
            r.range.max
        ));
    }
    write_output(None, &lines.join("\n"))
}

pub fn simulate(
    hours: u32,
    seed: u32,
    end: Option<&str>,
    no_faults: bool,
    output: Option<&Path>,
) -> eyre::Result<()> {
    let end = match end {
        Some(raw) => parse_bound(raw)?,
        None => {
            let now = Utc::now();
            now.with_second(0)
                .and_then(|t| t.with_nanosecond(0))
                .unwrap_or(now)
        }
    };
    let mut sim = SimConfig::new(end, hours, seed);
    if no_faults {
        sim = sim.clean();
    }
    let batch = SimulatedStation::new(sim).generate();
    write_output(output, &serde_json::to_string_pretty(&batch)?)
}
