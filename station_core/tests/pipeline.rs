use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use rstest::rstest;
use station_core::{
    Category, CleanedBatch, Cleaner, CollectingSink, DateWindow, NullSink, OutlierCfg, OutlierKind,
    Reading, RejectReason, StageKind,
};
use station_traits::{RawBatch, RawCategory, RawRow};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

fn iso(min: i64) -> String {
    (t0() + TimeDelta::minutes(min))
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

fn rows(points: &[(i64, f64)]) -> Vec<RawRow> {
    points.iter().map(|(m, v)| RawRow::new(iso(*m), *v)).collect()
}

fn batch_of(category: &str, sensors: &[(&str, &[(i64, f64)])]) -> RawBatch {
    let mut b = RawBatch::new();
    let cat = b.entry(category.to_string()).or_default();
    for (name, pts) in sensors {
        cat.insert((*name).to_string(), rows(pts));
    }
    b
}

/// Turn a cleaned batch back into raw input, filtered branch only.
fn as_raw(out: &CleanedBatch) -> RawBatch {
    out.filtered()
        .into_iter()
        .map(|(c, sensors)| {
            let sensors: RawCategory = sensors
                .into_iter()
                .map(|(name, rs)| {
                    let rows: Vec<RawRow> = rs
                        .iter()
                        .map(|r| RawRow::new(r.timestamp.to_rfc3339(), r.value))
                        .collect();
                    (name, rows)
                })
                .collect();
            (c.as_str().to_string(), sensors)
        })
        .collect()
}

fn at(min: i64, v: f64) -> Reading {
    Reading::new(t0() + TimeDelta::minutes(min), v)
}

fn no_outliers() -> Cleaner {
    Cleaner::builder()
        .with_outlier(OutlierCfg {
            kind: OutlierKind::Disabled,
            ..OutlierCfg::default()
        })
        .build()
        .unwrap()
}

#[test]
fn single_spike_is_removed_from_filtered_only() {
    let pts: Vec<(i64, f64)> = [1.0, 1.0, 1.0, 1.0, 100.0, 1.0, 1.0, 1.0, 1.0]
        .iter()
        .enumerate()
        .map(|(i, v)| (5 * i as i64, *v))
        .collect();
    let batch = batch_of("temperature_celsius", &[("dht22 indoor", &pts)]);
    let sink = CollectingSink::new();
    let out = Cleaner::default().clean_batch(&batch, &sink);
    let pair = out.series(Category::Temperature, "dht22 indoor").unwrap();
    // 100 °C is outside the DHT22 range too, so it never reaches the filtered branch.
    assert_eq!(pair.clipped.len(), 8);
    assert_eq!(pair.filtered.len(), 8);
    assert_eq!(sink.count(StageKind::RangeClip), 1);

    // Same shape within range: the clipped branch keeps it, the rolling filter does not.
    let pts: Vec<(i64, f64)> = [20.0, 20.0, 20.0, 20.0, 70.0, 20.0, 20.0, 20.0, 20.0]
        .iter()
        .enumerate()
        .map(|(i, v)| (5 * i as i64, *v))
        .collect();
    let batch = batch_of("temperature_celsius", &[("dht22 indoor", &pts)]);
    let sink = CollectingSink::new();
    let out = Cleaner::default().clean_batch(&batch, &sink);
    let pair = out.series(Category::Temperature, "dht22 indoor").unwrap();
    assert_eq!(pair.clipped.len(), 9);
    assert!(pair.filtered.iter().all(|r| r.value == 20.0));
    assert_eq!(pair.filtered.len(), 8);
    let ev = sink.events();
    assert_eq!(ev.len(), 1);
    assert_eq!(ev[0].stage, StageKind::RollingThreshold);
    assert_eq!(ev[0].value, Some(70.0));
}

#[test]
fn boundary_neighbor_is_kept() {
    // 08:00, 09:00, 10:00 with window [09:30, 11:00]: 09:00 stays, 08:00 goes.
    let batch = batch_of(
        "relative_humidity_percent",
        &[("dht22 outdoor", &[(480, 50.0), (540, 51.0), (600, 52.0)])],
    );
    let window = DateWindow::new(
        Some(t0() + TimeDelta::minutes(570)),
        Some(t0() + TimeDelta::minutes(660)),
    )
    .unwrap();
    let c = no_outliers().with_window(window);
    let out = c.clean_batch(&batch, &NullSink);
    let pair = out.series(Category::Humidity, "dht22 outdoor").unwrap();
    assert_eq!(pair.clipped, vec![at(540, 51.0), at(600, 52.0)]);

    let strict = Cleaner::builder()
        .with_cfg(c.cfg().clone())
        .keep_boundary_neighbor(false)
        .with_window(window)
        .build()
        .unwrap();
    let out = strict.clean_batch(&batch, &NullSink);
    let pair = out.series(Category::Humidity, "dht22 outdoor").unwrap();
    assert_eq!(pair.clipped, vec![at(600, 52.0)]);
    assert_eq!(out.window, window);
}

#[test]
fn two_hour_gap_gets_held_point() {
    let batch = batch_of(
        "temperature_celsius",
        &[("bmp280 outdoor", &[(0, 10.0), (120, 20.0)])],
    );
    let out = no_outliers().clean_batch(&batch, &NullSink);
    let pair = out.series(Category::Temperature, "bmp280 outdoor").unwrap();
    assert_eq!(pair.clipped, vec![at(0, 10.0), at(120, 20.0)]);
    assert_eq!(
        pair.filtered,
        vec![at(0, 10.0), at(90, 10.0), at(120, 20.0)]
    );
}

#[test]
fn shorter_sensor_is_extended_to_shared_right_edge() {
    // A ends at 10:00, B at 10:30.
    let batch = batch_of(
        "temperature_celsius",
        &[
            ("a", &[(590, 18.0), (595, 18.0), (600, 18.0)]),
            ("b", &[(620, 21.0), (625, 21.0), (630, 21.0)]),
        ],
    );
    let out = Cleaner::default().clean_batch(&batch, &NullSink);
    let a = out.series(Category::Temperature, "a").unwrap();
    let b = out.series(Category::Temperature, "b").unwrap();
    assert_eq!(a.filtered.last(), Some(&at(630, 18.0)));
    assert_eq!(a.filtered.len(), 4);
    assert_eq!(b.filtered.len(), 3);
    // Clipped branch is never extended.
    assert_eq!(a.clipped.len(), 3);
}

#[test]
fn extension_does_not_cross_categories() {
    let mut batch = batch_of("temperature_celsius", &[("t", &[(0, 20.0), (5, 20.0)])]);
    batch.extend(batch_of(
        "air_pressure_pa",
        &[("p", &[(0, 101_000.0), (500, 101_000.0)])],
    ));
    let out = Cleaner::default().clean_batch(&batch, &NullSink);
    let t = out.series(Category::Temperature, "t").unwrap();
    assert_eq!(t.filtered.last(), Some(&at(5, 20.0)));
}

#[test]
fn full_pipeline_is_idempotent_on_its_output() {
    let mut pts: Vec<(i64, f64)> = [10.0, 10.0, 10.0, 10.0, 50.0, 10.0, 10.0, 10.0, 10.0]
        .iter()
        .enumerate()
        .map(|(i, v)| (5 * i as i64, *v))
        .collect();
    // Two hour gap, then a new level.
    pts.extend((0..5).map(|i| (160 + 5 * i, 12.0)));
    let batch = batch_of("temperature_celsius", &[("dht22 indoor", &pts)]);

    let c = Cleaner::default();
    let once = c.clean_batch(&batch, &NullSink);
    let pair = once.series(Category::Temperature, "dht22 indoor").unwrap();
    // 50 rejected, one held point at 130 min.
    assert_eq!(pair.filtered.len(), 14);
    assert!(pair.filtered.contains(&at(130, 10.0)));

    let sink = CollectingSink::new();
    let twice = c.clean_batch(&as_raw(&once), &sink);
    assert_eq!(
        twice.series(Category::Temperature, "dht22 indoor").unwrap().filtered,
        pair.filtered
    );
    assert!(sink.is_empty());
}

#[test]
fn gap_left_by_a_removed_spike_is_bridged_in_the_same_pass() {
    // Readings every 20 minutes; dropping the spike at 80 leaves 60 -> 100.
    let pts: Vec<(i64, f64)> = [20.0, 20.1, 20.2, 20.3, 45.0, 20.4, 20.5, 20.6, 20.7]
        .iter()
        .enumerate()
        .map(|(i, v)| (20 * i as i64, *v))
        .collect();
    let batch = batch_of("temperature_celsius", &[("dht22 indoor", &pts)]);

    let c = Cleaner::default();
    let sink = CollectingSink::new();
    let once = c.clean_batch(&batch, &sink);
    let pair = once.series(Category::Temperature, "dht22 indoor").unwrap();
    assert_eq!(sink.count(StageKind::RollingThreshold), 1);
    assert_eq!(pair.filtered.len(), 9);
    assert!(!pair.filtered.iter().any(|r| r.value == 45.0));
    assert!(pair.filtered.contains(&at(70, 20.3)));

    let sink = CollectingSink::new();
    let twice = c.clean_batch(&as_raw(&once), &sink);
    assert_eq!(
        twice.series(Category::Temperature, "dht22 indoor").unwrap().filtered,
        pair.filtered
    );
    assert!(sink.is_empty());
}

#[rstest]
#[case::empty_batch(RawBatch::new())]
#[case::empty_sensor(batch_of("temperature_celsius", &[("dht22 indoor", &[])]))]
fn empty_input_is_not_an_error(#[case] batch: RawBatch) {
    let sink = CollectingSink::new();
    let out = Cleaner::default().clean_batch(&batch, &sink);
    assert!(
        out.categories
            .values()
            .flat_map(|s| s.values())
            .all(|p| p.clipped.is_empty() && p.filtered.is_empty())
    );
    assert!(sink.is_empty());
}

#[test]
fn malformed_rows_do_not_stop_the_batch() {
    let mut batch = batch_of(
        "temperature_celsius",
        &[("dht22 indoor", &[(0, 20.0), (5, 20.5)])],
    );
    let s = batch
        .get_mut("temperature_celsius")
        .and_then(|c| c.get_mut("dht22 indoor"))
        .unwrap();
    s.insert(1, RawRow::new("yesterday", 20.2));
    s.push(RawRow {
        timestamp: iso(10),
        value: None,
    });

    let sink = CollectingSink::new();
    let out = no_outliers().clean_batch(&batch, &sink);
    let pair = out.series(Category::Temperature, "dht22 indoor").unwrap();
    assert_eq!(pair.clipped, vec![at(0, 20.0), at(5, 20.5)]);
    assert_eq!(sink.count(StageKind::Parse), 2);
    assert!(matches!(
        sink.events()[0].reason,
        RejectReason::Malformed { ref error } if error.contains("yesterday")
    ));
}

#[test]
fn sensors_never_share_rolling_windows() {
    // Alone, each series is constant; merged they would disagree.
    let a: Vec<(i64, f64)> = (0..5).map(|i| (5 * i, 10.0)).collect();
    let b: Vec<(i64, f64)> = (0..5).map(|i| (5 * i, 30.0)).collect();
    let batch = batch_of("temperature_celsius", &[("a", &a), ("b", &b)]);
    let sink = CollectingSink::new();
    let out = Cleaner::default().clean_batch(&batch, &sink);
    assert!(sink.is_empty());
    assert_eq!(out.series(Category::Temperature, "a").unwrap().filtered.len(), 5);
    assert_eq!(out.series(Category::Temperature, "b").unwrap().filtered.len(), 5);
}

#[test]
fn parallel_output_equals_sequential() {
    let temp: Vec<(i64, f64)> = (0..200)
        .map(|i| (5 * i, 20.0 + ((i % 7) as f64) * 0.3))
        .collect();
    let hum: Vec<(i64, f64)> = (0..150)
        .map(|i| (5 * i + if i > 80 { 90 } else { 0 }, 40.0 + (i % 5) as f64))
        .collect();
    let pres: Vec<(i64, f64)> = (0..100)
        .map(|i| (10 * i, 101_000.0 + (i % 3) as f64 * 20.0))
        .collect();
    let mut batch = batch_of(
        "temperature_celsius",
        &[("dht22 indoor", &temp), ("bmp280 outdoor", &temp[..150])],
    );
    batch.extend(batch_of(
        "relative_humidity_percent",
        &[("dht22 indoor", &hum)],
    ));
    batch.extend(batch_of("air_pressure_pa", &[("bmp280 outdoor", &pres)]));

    let c = Cleaner::default();
    let seq_sink = CollectingSink::new();
    let par_sink = CollectingSink::new();
    let seq = c.clean_batch(&batch, &seq_sink);
    let par = c.clean_batch_parallel(&batch, &par_sink);
    assert_eq!(seq, par);
    assert_eq!(seq_sink.len(), par_sink.len());
}

#[test]
fn output_serializes_with_wire_names() {
    let batch = batch_of("air_pressure_pa", &[("bmp280 outdoor", &[(0, 101_325.0)])]);
    let out = Cleaner::default().clean_batch(&batch, &NullSink);
    let json = serde_json::to_value(&out).unwrap();
    let series = &json["categories"]["air_pressure_pa"]["bmp280 outdoor"];
    assert_eq!(series["clipped"][0]["value"], 101_325.0);
    assert_eq!(series["filtered"][0]["timestamp"], "2024-06-01T00:00:00Z");
    assert!(json["window"]["start"].is_null());
}
