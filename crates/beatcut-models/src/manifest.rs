//! Planner outcome records and the plan manifest written next to the output.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::plan::SegmentPlan;
use crate::timeline::BeatTimeline;

/// Terminal state of a planning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlannerStatus {
    /// The cursor reached the end of the beat timeline
    Done,
    /// Every clip in the pool was claimed
    Exhausted,
    /// A cancellation signal stopped the loop
    Cancelled,
}

impl PlannerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlannerStatus::Done => "done",
            PlannerStatus::Exhausted => "exhausted",
            PlannerStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PlannerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A claimed clip that could not be scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SkippedClip {
    pub clip_id: u64,
    pub file_name: String,
    pub beat_index: usize,
    pub reason: String,
}

/// A planned step whose segment layout was degenerate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DroppedStep {
    pub clip_id: u64,
    pub file_name: String,
    pub beat_index: usize,
    pub beat_span: usize,
    pub segment_duration: f64,
    pub spacing: f64,
}

/// Diagnostic record of one planning run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanManifest {
    pub generated_at: DateTime<Utc>,
    pub seed: u64,
    pub status: PlannerStatus,
    pub beats: BeatTimeline,
    pub plans: Vec<SegmentPlan>,
    #[serde(default)]
    pub excluded_files: Vec<String>,
    #[serde(default)]
    pub skipped: Vec<SkippedClip>,
    #[serde(default)]
    pub dropped: Vec<DroppedStep>,
}

impl PlanManifest {
    /// Sum of the footage every plan contributes.
    pub fn total_output_duration(&self) -> f64 {
        self.plans.iter().map(SegmentPlan::output_duration).sum()
    }
}
