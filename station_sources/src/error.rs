use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceFault {
    #[error("load failed: {0}")]
    Load(String),
    #[error("source exhausted after {0} fetch(es)")]
    Exhausted(usize),
}

pub type Result<T> = std::result::Result<T, SourceFault>;
