//! Shared data models for the beatcut stitcher.
//!
//! This crate provides Serde-serializable types for:
//! - Beat timelines produced by the beat detector
//! - Source clip records and their categories
//! - Segment plans emitted by the planner
//! - Encoding configuration for the final export
//! - Plan manifests written next to the output

pub mod clip;
pub mod encoding;
pub mod error;
pub mod manifest;
pub mod plan;
pub mod timeline;

// Re-export common types
pub use clip::{parse_clip_id, ClipCategory, ClipRecord};
pub use encoding::EncodingConfig;
pub use error::{ModelError, ModelResult};
pub use manifest::{DroppedStep, PlanManifest, PlannerStatus, SkippedClip};
pub use plan::{SegmentMode, SegmentPlan, SourceRange};
pub use timeline::BeatTimeline;
