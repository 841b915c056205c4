//! Resolver error type.

use thiserror::Error;

use josh_core::AttributeIndex;
use josh_handler::HandlerError;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("circular dependency on attribute {0}")]
    CircularDependency(AttributeIndex),

    #[error("no path form for {0:?}")]
    InvalidPath(String),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

pub type ResolveResult<T> = Result<T, ResolveError>;
