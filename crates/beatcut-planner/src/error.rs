//! Planner error types.

use thiserror::Error;

pub type PlannerResult<T> = Result<T, PlannerError>;

#[derive(Debug, Error, PartialEq)]
pub enum PlannerError {
    #[error("Invalid planner configuration: {0}")]
    InvalidConfig(String),
}

impl PlannerError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
