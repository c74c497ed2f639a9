use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CleanError {
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
    #[error("missing value")]
    MissingValue,
    #[error("non-finite value: {0}")]
    NonFinite(f64),
    #[error("unknown category '{0}'")]
    UnknownCategory(String),
    #[error("fetch failed: {0}")]
    Source(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl CleanError {
    /// Data errors drop a single record; everything else rejects the invocation.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            CleanError::InvalidTimestamp(_)
                | CleanError::MissingValue
                | CleanError::NonFinite(_)
                | CleanError::UnknownCategory(_)
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("window start is after window end")]
    InvertedWindow,
    #[error("invalid window bound: {0}")]
    InvalidWindowBound(String),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
