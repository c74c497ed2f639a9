//! Readings, categories and timestamp parsing.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use station_traits::RawRow;

use crate::error::CleanError;

/// A single timestamped sensor value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// The same value held at another instant (used for synthetic points).
    pub fn held_at(&self, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            value: self.value,
        }
    }
}

impl TryFrom<&RawRow> for Reading {
    type Error = CleanError;

    fn try_from(row: &RawRow) -> Result<Self, Self::Error> {
        let timestamp = parse_timestamp(&row.timestamp)?;
        let value = row.value.ok_or(CleanError::MissingValue)?;
        if !value.is_finite() {
            return Err(CleanError::NonFinite(value));
        }
        Ok(Self { timestamp, value })
    }
}

/// Measurement category; the serialized names match the storage column names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Category {
    #[serde(rename = "temperature_celsius")]
    Temperature,
    #[serde(rename = "relative_humidity_percent")]
    Humidity,
    #[serde(rename = "air_pressure_pa")]
    Pressure,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Temperature, Category::Humidity, Category::Pressure];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Temperature => "temperature_celsius",
            Category::Humidity => "relative_humidity_percent",
            Category::Pressure => "air_pressure_pa",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Category::Temperature => "°C",
            Category::Humidity => "%",
            Category::Pressure => "Pa",
        }
    }
}

impl FromStr for Category {
    type Err = CleanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CleanError::UnknownCategory(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two outputs per sensor: range/date filtered, and display-ready.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesPair {
    pub clipped: Vec<Reading>,
    pub filtered: Vec<Reading>,
}

const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 timestamp as stored by the station databases.
///
/// Accepts RFC 3339 (any offset, normalized to UTC), naive date-times with `T`
/// or space separator and optional seconds/fraction (taken as UTC), and bare
/// dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, CleanError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(CleanError::InvalidTimestamp(raw.to_string()));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(CleanError::InvalidTimestamp(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case("2024-11-20T12:34:56Z")]
    #[case("2024-11-20T13:34:56+01:00")]
    #[case("2024-11-20T12:34:56")]
    #[case("2024-11-20 12:34:56")]
    #[case("2024-11-20T12:34:56.000")]
    #[case(" 2024-11-20T12:34:56 ")]
    fn accepts_station_timestamp_forms(#[case] raw: &str) {
        let expected = Utc.with_ymd_and_hms(2024, 11, 20, 12, 34, 56).unwrap();
        assert_eq!(parse_timestamp(raw).unwrap(), expected);
    }

    #[test]
    fn minute_and_date_resolution() {
        assert_eq!(
            parse_timestamp("2024-11-20T12:34").unwrap(),
            Utc.with_ymd_and_hms(2024, 11, 20, 12, 34, 0).unwrap()
        );
        assert_eq!(
            parse_timestamp("2024-11-20").unwrap(),
            Utc.with_ymd_and_hms(2024, 11, 20, 0, 0, 0).unwrap()
        );
    }

    #[rstest]
    #[case("")]
    #[case("yesterday")]
    #[case("2024-13-01T00:00:00")]
    #[case("1700000000")]
    fn rejects_garbage(#[case] raw: &str) {
        assert!(matches!(
            parse_timestamp(raw),
            Err(CleanError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn raw_row_conversion_reports_missing_and_non_finite() {
        let missing = RawRow {
            timestamp: "2024-01-01T00:00:00".into(),
            value: None,
        };
        assert_eq!(Reading::try_from(&missing), Err(CleanError::MissingValue));
        let nan = RawRow::new("2024-01-01T00:00:00", f64::NAN);
        assert!(matches!(
            Reading::try_from(&nan),
            Err(CleanError::NonFinite(_))
        ));
    }

    #[test]
    fn category_round_trips_through_wire_names() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
        assert!("wind_speed".parse::<Category>().is_err());
    }
}
