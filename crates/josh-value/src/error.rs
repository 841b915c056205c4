//! Error types for `josh-value`.

use thiserror::Error;

use josh_units::Units;

/// Errors raised while combining or converting [`crate::Value`]s.
#[derive(Debug, Error)]
pub enum ValueError {
    #[error("type mismatch: cannot combine {0} with {1}")]
    TypeMismatch(&'static str, &'static str),

    #[error("unit mismatch: {0} is not compatible with {1}")]
    UnitMismatch(Units, Units),

    #[error("cannot coerce {0} to a numeric value")]
    NotNumeric(&'static str),

    #[error("division by zero")]
    DivideByZero,
}

/// Alias for `Result<T, ValueError>`.
pub type ValueResult<T> = Result<T, ValueError>;
