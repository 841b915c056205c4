//! Framework error type.
//!
//! Sub-crates define their own error enums and convert them into `CoreError`
//! via `From` impls where a failure genuinely originates in a core type, or
//! wrap `CoreError` as one variant of a richer enum. Both patterns are used
//! across this workspace; prefer whichever keeps error sites closest to
//! where the failure was detected.

use thiserror::Error;

use crate::EntityId;

/// The top-level error type for `josh-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `josh-*` crates.
pub type CoreResult<T> = Result<T, CoreError>;
