//! Error type for `josh-query`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query target contained no replicates")]
    EmptyInput,

    #[error("unknown metric {0:?}")]
    UnknownMetric(String),

    #[error("unknown conditional {0:?}")]
    UnknownConditional(String),

    #[error("is_between metric requires target_b")]
    RangeMismatch,
}

pub type QueryResult<T> = Result<T, QueryError>;
