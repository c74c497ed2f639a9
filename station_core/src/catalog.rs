//! Known station sensors and their physical ranges.
//!
//! Mirrors what the dashboard server advertises on `/api/available_data`:
//! which sensor tables exist per category and where they are mounted.

use serde::Serialize;

use crate::config::{PhysicalRange, RangeRule};
use crate::reading::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Indoor,
    Outdoor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorEntry {
    /// Storage table id, e.g. `dht22_temperature_celsius`.
    pub name: &'static str,
    pub category: Category,
    pub locations: &'static [Location],
    pub range: PhysicalRange,
}

const DHT22_TEMPERATURE: PhysicalRange = PhysicalRange::new(-40.0, 80.0);
const BMP280_TEMPERATURE: PhysicalRange = PhysicalRange::new(-40.0, 85.0);
const HUMIDITY: PhysicalRange = PhysicalRange::new(0.0, 100.0);
const PRESSURE: PhysicalRange = PhysicalRange::new(30_000.0, 110_000.0);

pub fn sensors() -> Vec<SensorEntry> {
    vec![
        SensorEntry {
            name: "dht22_temperature_celsius",
            category: Category::Temperature,
            locations: &[Location::Indoor, Location::Outdoor],
            range: DHT22_TEMPERATURE,
        },
        SensorEntry {
            name: "bmp280_temperature_celsius",
            category: Category::Temperature,
            locations: &[Location::Outdoor],
            range: BMP280_TEMPERATURE,
        },
        SensorEntry {
            name: "dht22_relative_humidity_percent",
            category: Category::Humidity,
            locations: &[Location::Indoor, Location::Outdoor],
            range: HUMIDITY,
        },
        SensorEntry {
            name: "bmp280_air_pressure_pa",
            category: Category::Pressure,
            locations: &[Location::Outdoor],
            range: PRESSURE,
        },
    ]
}

/// Range used when no rule matches a category at all.
pub fn default_range(category: Category) -> PhysicalRange {
    match category {
        Category::Temperature => DHT22_TEMPERATURE,
        Category::Humidity => HUMIDITY,
        Category::Pressure => PRESSURE,
    }
}

/// Built-in rules, most specific first. Sensor names are free-form display
/// names ("bmp280 outdoor"), so the chip is matched as a substring.
pub fn builtin_range_rules() -> Vec<RangeRule> {
    vec![
        RangeRule::new(Some("bmp280"), Category::Temperature, -40.0, 85.0),
        RangeRule::new(None, Category::Temperature, -40.0, 80.0),
        RangeRule::new(None, Category::Humidity, 0.0, 100.0),
        RangeRule::new(None, Category::Pressure, 30_000.0, 110_000.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_a_sensor_and_a_catch_all_rule() {
        let sensors = sensors();
        let rules = builtin_range_rules();
        for c in Category::ALL {
            assert!(sensors.iter().any(|s| s.category == c));
            assert!(rules.iter().any(|r| r.category == c && r.sensor.is_none()));
        }
    }

    #[test]
    fn catalog_ranges_agree_with_rule_table() {
        let table = crate::config::RangeTable::builtin();
        for s in sensors() {
            assert_eq!(table.resolve(s.category, s.name), s.range, "{}", s.name);
        }
    }
}
