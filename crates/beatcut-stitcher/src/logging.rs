//! Structured run logging.
//!
//! Every log line of a stitching run carries the run id and the pipeline
//! stage it came from, so interleaved output from several runs stays
//! attributable.

use tracing::{error, info, warn, Span};
use uuid::Uuid;

/// Logger tagging events with a run id and the current stage.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    stage: String,
}

impl RunLogger {
    /// Logger for a fresh run with a random id.
    pub fn new(stage: &str) -> Self {
        Self::from_string(&Uuid::new_v4().to_string(), stage)
    }

    pub fn from_string(run_id: &str, stage: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            stage: stage.to_string(),
        }
    }

    /// Same run, different stage.
    pub fn stage(&self, stage: &str) -> Self {
        Self {
            run_id: self.run_id.clone(),
            stage: stage.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(run_id = %self.run_id, stage = %self.stage, "Stage started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(run_id = %self.run_id, stage = %self.stage, "Stage progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(run_id = %self.run_id, stage = %self.stage, "Stage warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(run_id = %self.run_id, stage = %self.stage, "Stage error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(run_id = %self.run_id, stage = %self.stage, "Stage completed: {}", message);
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn stage_name(&self) -> &str {
        &self.stage
    }

    /// Span carrying the run id and stage for nested instrumentation.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("run", run_id = %self.run_id, stage = %self.stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_logger_has_uuid_run_id() {
        let logger = RunLogger::new("soundtrack");
        assert!(Uuid::parse_str(logger.run_id()).is_ok());
        assert_eq!(logger.stage_name(), "soundtrack");
    }

    #[test]
    fn test_stage_keeps_run_id() {
        let logger = RunLogger::from_string("run-123", "beats");
        let next = logger.stage("plan");
        assert_eq!(next.run_id(), "run-123");
        assert_eq!(next.stage_name(), "plan");
    }
}
