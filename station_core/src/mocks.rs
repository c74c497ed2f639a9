//! Test and helper sources for station_core

use station_traits::{BatchSource, RawBatch, SourceError};

/// A source whose fetch always fails; models an unreachable server.
pub struct FailingSource {
    message: String,
}

impl FailingSource {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl BatchSource for FailingSource {
    fn fetch(&mut self) -> Result<RawBatch, SourceError> {
        Err(Box::new(std::io::Error::other(self.message.clone())))
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

/// Serves a fixed batch and counts fetches.
pub struct CountingSource {
    batch: RawBatch,
    fetches: usize,
}

impl CountingSource {
    pub fn new(batch: RawBatch) -> Self {
        Self { batch, fetches: 0 }
    }

    pub fn fetches(&self) -> usize {
        self.fetches
    }
}

impl BatchSource for CountingSource {
    fn fetch(&mut self) -> Result<RawBatch, SourceError> {
        self.fetches += 1;
        Ok(self.batch.clone())
    }

    fn describe(&self) -> String {
        "counting".to_string()
    }
}
