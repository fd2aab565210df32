//! Shaping errors.

use thiserror::Error;

/// Grouping or rendering failed on an otherwise successful backend result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapingError {
    #[error("record has no field `{field}` required for grouping")]
    MissingField { field: String },

    #[error("cached snapshot is malformed: {0}")]
    Snapshot(String),
}

/// Result type for shaping operations.
pub type ShapingResult<T> = Result<T, ShapingError>;
