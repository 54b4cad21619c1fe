//! Error types for the fallible seams (storage, score submission, tuning)
//!
//! None of these escape a game command: the `Game` logs and swallows them.

use thiserror::Error;

/// Key/value storage failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// External score-submission failures
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("score rejected: {0}")]
    Rejected(String),
}

/// Tuning override parse failures
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("invalid tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid tuning value: {field} = {value}")]
    OutOfRange { field: &'static str, value: f32 },
}
