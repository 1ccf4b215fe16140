//! Error types for filter conversion

use thiserror::Error;

/// Errors that can occur while parsing or converting filters
#[derive(Debug, Error)]
pub enum FilterError {
    /// Raised by the predicate (string) form for a scalar under a key that is
    /// not in the operator vocabulary.
    #[error("Unknown operator '{operator}' for column '{column}'")]
    UnknownOperator { operator: String, column: String },

    /// Raised by the find-condition (structured) form for the same input.
    #[error("Bad request: unknown operator '{0}'")]
    BadRequest(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FilterError {
    pub fn unknown_operator(operator: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownOperator {
            operator: operator.into(),
            column: column.into(),
        }
    }

    pub fn bad_request(operator: impl Into<String>) -> Self {
        Self::BadRequest(operator.into())
    }

    pub fn invalid_filter(msg: impl Into<String>) -> Self {
        Self::InvalidFilter(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;
