//! Model validation errors.

use thiserror::Error;

/// Result type for model construction.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while validating model values.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Beat timestamp at index {index} is not finite")]
    NonFinite { index: usize },

    #[error("Beat timestamps must be strictly increasing (index {index}: {previous:.3}s -> {current:.3}s)")]
    NotIncreasing {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("Invalid source range: {start:.3}s..{end:.3}s")]
    InvalidRange { start: f64, end: f64 },
}
