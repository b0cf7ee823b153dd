//! Error types for the session pattern pipeline.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the session pattern pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (bad parameters, invalid correction table).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metric name that has no clustering variant.
    #[error("Unsupported metric: {0}")]
    UnsupportedMetric(String),

    /// Data error (invalid or malformed data).
    #[error("Data error: {0}")]
    Data(String),

    /// Insufficient data for computation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an unsupported metric error.
    pub fn unsupported_metric(name: impl Into<String>) -> Self {
        Error::UnsupportedMetric(name.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create an insufficient data error.
    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Error::InsufficientData(msg.into())
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Error::Database(msg.into())
    }

    /// Whether this error stems from caller-supplied parameters.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_) | Error::UnsupportedMetric(_))
    }
}
