//! File-backed sources: a batch JSON document or a single-series CSV.

use std::path::PathBuf;

use station_traits::{BatchSource, RawBatch, RawCategory, SourceError};

use crate::error::SourceFault;

/// Re-reads the file on every fetch, so edits show up on the next refresh.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BatchSource for JsonFileSource {
    fn fetch(&mut self) -> Result<RawBatch, SourceError> {
        station_config::load_batch_json(&self.path)
            .map_err(|e| Box::new(SourceFault::Load(format!("{e:#}"))) as SourceError)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// One sensor's `timestamp,value` CSV presented as a one-series batch.
#[derive(Debug, Clone)]
pub struct CsvSeriesSource {
    path: PathBuf,
    category: String,
    sensor: String,
}

impl CsvSeriesSource {
    pub fn new(path: impl Into<PathBuf>, category: &str, sensor: &str) -> Self {
        Self {
            path: path.into(),
            category: category.to_string(),
            sensor: sensor.to_string(),
        }
    }
}

impl BatchSource for CsvSeriesSource {
    fn fetch(&mut self) -> Result<RawBatch, SourceError> {
        let rows = station_config::load_series_csv(&self.path)
            .map_err(|e| Box::new(SourceFault::Load(format!("{e:#}"))) as SourceError)?;
        let mut sensors = RawCategory::new();
        sensors.insert(self.sensor.clone(), rows);
        let mut batch = RawBatch::new();
        batch.insert(self.category.clone(), sensors);
        Ok(batch)
    }

    fn describe(&self) -> String {
        format!("csv:{} ({}/{})", self.path.display(), self.category, self.sensor)
    }
}
