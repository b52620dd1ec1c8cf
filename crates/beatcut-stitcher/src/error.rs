//! Pipeline error types.

use std::path::PathBuf;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Terminal failures of a stitching run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No soundtrack found in {}", .0.display())]
    MissingSoundtrack(PathBuf),

    #[error("Beat detection produced no beats for {}", .0.display())]
    NoBeats(PathBuf),

    #[error("No usable clips found in {}", .0.display())]
    NoClips(PathBuf),

    #[error("Planner produced no segments (status: {status})")]
    NoPlansProduced { status: beatcut_models::PlannerStatus },

    #[error("None of the {plans} planned segments could be realized")]
    NoSegmentsRealized { plans: usize },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Media error: {0}")]
    Media(#[from] beatcut_media::MediaError),

    #[error("Planner error: {0}")]
    Planner(#[from] beatcut_planner::PlannerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Fold media-level cancellation and empty realizations into their
    /// pipeline counterparts.
    pub fn from_media(err: beatcut_media::MediaError, plans: usize) -> Self {
        match err {
            beatcut_media::MediaError::Cancelled => Self::Cancelled,
            beatcut_media::MediaError::NothingToExport => Self::NoSegmentsRealized { plans },
            other => Self::Media(other),
        }
    }
}
