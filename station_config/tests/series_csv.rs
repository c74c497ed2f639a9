use std::fs::File;
use std::io::Write;

use rstest::rstest;
use station_config::{load_batch_json, load_series_csv};
use tempfile::tempdir;

#[rstest]
fn csv_rows_keep_raw_timestamps() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("series.csv");

    let mut f = File::create(&path).unwrap();
    writeln!(f, "timestamp,value").unwrap();
    writeln!(f, "2024-11-20T12:00:00, 21.4").unwrap();
    writeln!(f, "2024-11-20 12:05:00,21.5").unwrap();
    writeln!(f, "2024-11-20T12:10:00,").unwrap();

    let rows = load_series_csv(&path).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].value, Some(21.4));
    // Timestamps are not interpreted here.
    assert_eq!(rows[1].timestamp, "2024-11-20 12:05:00");
    // An empty value is a missing value, reported later by the cleaner.
    assert_eq!(rows[2].value, None);
}

#[rstest]
fn csv_with_wrong_headers_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad_headers.csv");

    let mut f = File::create(&path).unwrap();
    writeln!(f, "time,reading").unwrap();
    writeln!(f, "2024-11-20T12:00:00,21.4").unwrap();

    let err = load_series_csv(&path).expect_err("should error on bad headers");
    assert!(format!("{err}").contains("headers 'timestamp,value'"));
}

#[rstest]
fn csv_with_non_numeric_value_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad_numeric.csv");

    let mut f = File::create(&path).unwrap();
    writeln!(f, "timestamp,value").unwrap();
    writeln!(f, "2024-11-20T12:00:00,warm").unwrap();

    let err = load_series_csv(&path).expect_err("should error on non-numeric");
    assert!(format!("{err}").contains("invalid CSV row 2"));
}

#[rstest]
fn missing_files_name_the_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.json");
    let err = load_batch_json(&path).expect_err("missing file");
    assert!(format!("{err}").contains("nope.json"));
    let err = load_series_csv(&dir.path().join("nope.csv")).expect_err("missing file");
    assert!(format!("{err}").contains("nope.csv"));
}

#[rstest]
fn batch_json_tolerates_null_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("batch.json");
    std::fs::write(
        &path,
        r#"{"air_pressure_pa":{"bmp280 outdoor":[
            {"timestamp":"2024-11-20T12:00:00","value":101325.0},
            {"timestamp":"2024-11-20T12:05:00","value":null}
        ]}}"#,
    )
    .unwrap();
    let batch = load_batch_json(&path).unwrap();
    let rows = &batch["air_pressure_pa"]["bmp280 outdoor"];
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].value, None);
}
