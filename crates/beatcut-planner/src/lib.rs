//! Beat-synchronized clip scheduling.
//!
//! This crate provides:
//! - The clip pool: classification, sort order and at-most-once claims
//! - The segment planner: a greedy state machine walking the beat timeline
//! - Span pattern policy (streaks, weighted draws, long cuts)
//! - Flash-set layout math for long clips
//!
//! Planning is pure: no I/O, randomness injected by the caller.
//!
//! ```rust,ignore
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut pool = ClipPool::classify(sources, &long, &timelapse);
//! let outcome = SegmentPlanner::new(&timeline, PlannerConfig::default(), StdRng::seed_from_u64(7))
//!     .plan(&mut pool);
//! ```

pub mod config;
pub mod error;
pub mod flash;
pub mod planner;
pub mod policy;
pub mod pool;

pub use config::{PatternWeights, PlannerConfig};
pub use error::{PlannerError, PlannerResult};
pub use flash::{flash_layout, FlashLayout};
pub use planner::{PlanOutcome, SchedulerCursor, SegmentPlanner};
pub use policy::{Handling, SpanPattern};
pub use pool::{ClipPool, ClipSource, ExcludedClip, ExclusionReason};
