//! Error types for `josh-units`.

use thiserror::Error;

/// Errors raised while parsing or composing unit expressions.
#[derive(Debug, Error)]
pub enum UnitsError {
    #[error("could not parse units expression {0:?}")]
    Parse(String),

    #[error("units {0} and {1} are not compatible")]
    Incompatible(String, String),
}

/// Alias for `Result<T, UnitsError>`.
pub type UnitsResult<T> = Result<T, UnitsError>;
