//! Spatial-subsystem error type.

use thiserror::Error;

/// Errors produced by `josh-spatial`.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("spatial index was queried before any patch was registered")]
    EmptyIndex,

    #[error("invalid shape: {0}")]
    InvalidShape(String),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
