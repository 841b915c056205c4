//! Scheduler error type.

use josh_resolver::ResolveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("assertion failed: {message}")]
    AssertionFailed { message: String },

    #[error("replicate cancelled")]
    Cancelled,

    #[error("replicate exceeded its wall-clock deadline")]
    DeadlineExceeded,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{what} length {got} does not match entity count {expected}")]
    EntityCountMismatch {
        expected: usize,
        got: usize,
        what: &'static str,
    },
}

pub type SimResult<T> = Result<T, SimError>;
