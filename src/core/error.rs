//! Error types for the analyzer

use thiserror::Error;

/// Analyzer-wide error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("No interval data to aggregate")]
    NoData,

    #[error("Invalid reading: {0}")]
    InvalidReading(String),

    #[error("Malformed row at line {line}: {reason}")]
    MalformedReading { line: u64, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;
