use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Embedding model mismatch: index built with '{indexed}', query uses '{current}'")]
    ModelMismatch { indexed: String, current: String },

    #[error("Corrupt index at {location}: {reason}")]
    CorruptIndex { location: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn corrupt(location: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::CorruptIndex { location: location.to_string(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
