//! Segment plans emitted by the planner.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::clip::ClipCategory;
use crate::error::{ModelError, ModelResult};

/// Cut style of a planned segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SegmentMode {
    /// One clip for one beat
    Single,
    /// One clip held for two beats
    Double,
    /// One of the two clips sharing a half-beat split
    Half,
    /// Evenly spaced flash segments from a long clip
    FlashSet,
    /// One continuous multi-beat cut
    LongCut,
}

impl SegmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentMode::Single => "single",
            SegmentMode::Double => "double",
            SegmentMode::Half => "half",
            SegmentMode::FlashSet => "flash_set",
            SegmentMode::LongCut => "long_cut",
        }
    }
}

impl std::fmt::Display for SegmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A `[start, end]` range inside a source clip, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceRange {
    pub start: f64,
    pub end: f64,
}

impl SourceRange {
    /// Create a validated range (`0 <= start < end`).
    pub fn new(start: f64, end: f64) -> ModelResult<Self> {
        if !(start.is_finite() && end.is_finite()) || start < 0.0 || end <= start {
            return Err(ModelError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// One scheduled unit of output video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentPlan {
    pub clip_id: u64,
    pub file_name: String,
    pub path: PathBuf,
    pub category: ClipCategory,
    /// Beats consumed on the timeline (1 or 2)
    pub beat_span: usize,
    /// Timeline position where this segment starts
    pub start_time: f64,
    /// Timeline position where this segment ends
    pub end_time: f64,
    pub mode: SegmentMode,
    /// Reported duration of the source clip
    pub source_duration: f64,
    /// Explicit source layout; empty for straight cuts from the clip start
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_segments: Vec<SourceRange>,
}

impl SegmentPlan {
    /// Requested duration on the timeline.
    pub fn timeline_duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Requested duration clamped to what the source clip can supply.
    pub fn clamped_duration(&self) -> f64 {
        self.timeline_duration().min(self.source_duration).max(0.0)
    }

    /// Source ranges to extract, in order.
    ///
    /// Straight cuts take `[0, min(requested, source_duration)]`.
    pub fn source_ranges(&self) -> Vec<SourceRange> {
        if !self.sub_segments.is_empty() {
            return self.sub_segments.clone();
        }
        let end = self.clamped_duration();
        if end > 0.0 {
            vec![SourceRange { start: 0.0, end }]
        } else {
            Vec::new()
        }
    }

    /// Total seconds of footage this plan contributes.
    pub fn output_duration(&self) -> f64 {
        self.source_ranges().iter().map(SourceRange::duration).sum()
    }
}
