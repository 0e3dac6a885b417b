//! Common error types for the ADI enrichment tools

use thiserror::Error;

/// Common result type for ADI enrichment operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types shared by the configuration, bootstrap and file layers
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// CSV read/write error (wraps csv::Error)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parse/serialize error (wraps serde_json::Error)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid user input (e.g. an address file without the expected columns)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
