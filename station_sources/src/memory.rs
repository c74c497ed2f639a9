use station_traits::{BatchSource, RawBatch, SourceError};

use crate::error::SourceFault;

/// Serves a batch held in memory; optionally only a limited number of times.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    batch: RawBatch,
    remaining: Option<usize>,
    served: usize,
}

impl MemorySource {
    pub fn new(batch: RawBatch) -> Self {
        Self {
            batch,
            remaining: None,
            served: 0,
        }
    }

    /// Fail every fetch after the first `n`.
    pub fn limited(batch: RawBatch, n: usize) -> Self {
        Self {
            batch,
            remaining: Some(n),
            served: 0,
        }
    }

    pub fn served(&self) -> usize {
        self.served
    }
}

impl BatchSource for MemorySource {
    fn fetch(&mut self) -> Result<RawBatch, SourceError> {
        if let Some(left) = self.remaining.as_mut() {
            if *left == 0 {
                return Err(Box::new(SourceFault::Exhausted(self.served)));
            }
            *left -= 1;
        }
        self.served += 1;
        Ok(self.batch.clone())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
