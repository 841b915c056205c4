//! Error type for `josh-external`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no value for variable {variable:?} at ({x}, {y}) on step {step}")]
    NotFound { variable: String, step: u64, x: f64, y: f64 },

    #[error("unknown data handle {0:?}")]
    UnknownHandle(crate::external_data::Handle),

    #[error("job variation binding {0:?} is missing a path (expected name=path)")]
    MalformedBinding(String),

    #[error("unknown template token {0:?}")]
    UnknownTemplate(String),
}

pub type ExternalResult<T> = Result<T, ExternalError>;
