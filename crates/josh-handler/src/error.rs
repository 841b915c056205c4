use thiserror::Error;

use josh_core::AttributeIndex;
use josh_value::ValueError;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("unknown attribute index {0:?}")]
    UnknownAttribute(AttributeIndex),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("handler configuration error: {0}")]
    Config(String),
}

pub type HandlerResult<T> = Result<T, HandlerError>;
