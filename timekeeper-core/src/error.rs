//! Error types for the timing engine

use thiserror::Error;

/// Errors surfaced by the timing engine.
///
/// State-machine misuse (starting a running timer, stopping an idle one)
/// is never an error; those calls are no-ops.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimerError {
    #[error("Invalid duration: must be greater than zero")]
    InvalidDuration,

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(&'static str),

    #[error("Cannot parse duration: {0:?}")]
    Parse(String),
}

/// Result type for timing engine operations
pub type TimerResult<T> = Result<T, TimerError>;
