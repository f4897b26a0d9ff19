//! Error types for the recommender pipeline

use polars::prelude::PolarsError;
use thiserror::Error;

/// Result type alias for recommender operations
pub type Result<T> = std::result::Result<T, RecommenderError>;

/// Main error type for the recommender
#[derive(Error, Debug)]
pub enum RecommenderError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Memory budget exceeded: {what} needs {required} bytes, {budget} allows {limit} bytes")]
    MemoryBudget {
        what: String,
        budget: &'static str,
        required: u64,
        limit: u64,
    },

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl RecommenderError {
    pub(crate) fn invalid_parameter(
        name: &str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        RecommenderError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
