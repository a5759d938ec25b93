use thiserror::Error;

#[derive(Error, Debug)]
pub enum TradegateError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Index mismatch: {0}")]
    IndexMismatch(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TradegateError>;
