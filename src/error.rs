//! Error types for Ovula

use thiserror::Error;

/// Errors raised at the boundaries of the engine.
///
/// The calculators themselves are total; these only come out of payload
/// parsing, submission validation, the backend and the storage service.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Failed to parse backend payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cycle not found: {0}")]
    NotFound(String),

    #[error("Backend rejected the request: {0}")]
    Backend(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
