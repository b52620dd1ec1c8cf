//! Segment planner: the scheduling state machine.
//!
//! The planner walks the beat timeline with a cursor and, for every step,
//! claims the next unused clip from the pool and decides how it is cut.
//! It stops when the cursor reaches the last beat (`Done`), when the pool
//! runs dry (`Exhausted`) or when the cancellation signal is raised.
//!
//! Every step advances the cursor by at least one beat, including steps
//! whose clip is skipped or whose flash layout is dropped, so the loop
//! always terminates.

use rand::Rng;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use beatcut_models::{
    BeatTimeline, ClipRecord, DroppedStep, PlannerStatus, SegmentMode, SegmentPlan, SkippedClip,
    SourceRange,
};

use crate::config::PlannerConfig;
use crate::flash::flash_layout;
use crate::policy::{resolve_handling, Handling, SpanPattern};
use crate::pool::ClipPool;

/// Transient planner position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerCursor {
    pub beat_index: usize,
    pub consecutive_single_beat_count: usize,
}

impl SchedulerCursor {
    fn advance(&mut self, beats: usize) {
        self.beat_index = self.beat_index.saturating_add(beats.max(1));
    }

    fn record(&mut self, handling: &Handling) {
        if handling.extends_streak() {
            self.consecutive_single_beat_count += 1;
        } else {
            self.consecutive_single_beat_count = 0;
        }
    }
}

/// Everything a planning run produced.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plans: Vec<SegmentPlan>,
    pub status: PlannerStatus,
    pub skipped: Vec<SkippedClip>,
    pub dropped: Vec<DroppedStep>,
    /// Loop iterations (one per claimed clip group)
    pub steps: usize,
    /// Cursor position when planning stopped
    pub final_beat_index: usize,
}

impl PlanOutcome {
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Footage the plans contribute, after clamping to source lengths.
    pub fn total_output_duration(&self) -> f64 {
        self.plans.iter().map(SegmentPlan::output_duration).sum()
    }
}

enum StepFlow {
    Continue,
    Exhausted,
}

/// Greedy scheduler over a beat timeline and a clip pool.
pub struct SegmentPlanner<'a, R: Rng> {
    timeline: &'a BeatTimeline,
    config: PlannerConfig,
    rng: R,
    cursor: SchedulerCursor,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl<'a, R: Rng> SegmentPlanner<'a, R> {
    pub fn new(timeline: &'a BeatTimeline, config: PlannerConfig, rng: R) -> Self {
        Self {
            timeline,
            config,
            rng,
            cursor: SchedulerCursor::default(),
            cancel_rx: None,
        }
    }

    /// Set cancellation signal, checked once per step.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn cursor(&self) -> SchedulerCursor {
        self.cursor
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_rx
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false)
    }

    /// Run the planner to completion, exhaustion or cancellation.
    pub fn plan(mut self, pool: &mut ClipPool) -> PlanOutcome {
        let last_beat = self.timeline.len().saturating_sub(1);
        let mut outcome = PlanOutcome {
            plans: Vec::new(),
            status: PlannerStatus::Done,
            skipped: Vec::new(),
            dropped: Vec::new(),
            steps: 0,
            final_beat_index: 0,
        };

        info!(
            beats = self.timeline.len(),
            clips = pool.remaining(),
            "Planning segments"
        );

        let status = loop {
            if self.cursor.beat_index >= last_beat {
                break PlannerStatus::Done;
            }
            if self.is_cancelled() {
                info!(beat_index = self.cursor.beat_index, "Planning cancelled");
                break PlannerStatus::Cancelled;
            }
            let Some(clip) = pool.claim_next() else {
                info!(
                    beat_index = self.cursor.beat_index,
                    "All clips have been used"
                );
                break PlannerStatus::Exhausted;
            };

            outcome.steps += 1;
            if let StepFlow::Exhausted = self.step(clip, pool, &mut outcome) {
                break PlannerStatus::Exhausted;
            }
        };

        outcome.status = status;
        outcome.final_beat_index = self.cursor.beat_index;
        info!(
            status = %outcome.status,
            plans = outcome.plans.len(),
            skipped = outcome.skipped.len(),
            dropped = outcome.dropped.len(),
            "Planning finished"
        );
        outcome
    }

    fn step(&mut self, clip: ClipRecord, pool: &mut ClipPool, outcome: &mut PlanOutcome) -> StepFlow {
        let beat_index = self.cursor.beat_index;
        let remaining = self.timeline.remaining_intervals(beat_index);
        let handling = resolve_handling(
            &clip,
            remaining,
            &mut self.cursor.consecutive_single_beat_count,
            &self.config,
            &mut self.rng,
        );
        self.cursor.record(&handling);
        let span = handling.span();

        debug!(
            clip = %clip.file_name,
            category = %clip.category,
            beat_index,
            ?handling,
            "Scheduling clip"
        );

        if !clip.has_usable_duration() {
            self.skip(&clip, "source duration is not usable", outcome);
            self.cursor.advance(span);
            return StepFlow::Continue;
        }

        match handling {
            Handling::FlashSet { span } => self.flash_set(&clip, span, outcome),
            Handling::LongCut { span } => self.long_cut(&clip, span, outcome),
            Handling::Pattern(SpanPattern::SingleBeat) => {
                self.straight(&clip, 1, SegmentMode::Single, outcome)
            }
            Handling::Pattern(SpanPattern::TwoBeat) => {
                self.straight(&clip, 2, SegmentMode::Double, outcome)
            }
            Handling::Pattern(SpanPattern::HalfBeat) => return self.half_beat(clip, pool, outcome),
        }

        StepFlow::Continue
    }

    fn skip(&self, clip: &ClipRecord, reason: &str, outcome: &mut PlanOutcome) {
        warn!(
            clip = %clip.file_name,
            path = %clip.path.display(),
            beat_index = self.cursor.beat_index,
            duration = clip.duration,
            "Skipping clip: {}", reason
        );
        outcome.skipped.push(SkippedClip {
            clip_id: clip.id,
            file_name: clip.file_name.clone(),
            beat_index: self.cursor.beat_index,
            reason: reason.to_string(),
        });
    }

    fn base_plan(
        clip: &ClipRecord,
        span: usize,
        start_time: f64,
        end_time: f64,
        mode: SegmentMode,
    ) -> SegmentPlan {
        SegmentPlan {
            clip_id: clip.id,
            file_name: clip.file_name.clone(),
            path: clip.path.clone(),
            category: clip.category,
            beat_span: span,
            start_time,
            end_time,
            mode,
            source_duration: clip.duration,
            sub_segments: Vec::new(),
        }
    }

    /// One straight cut covering `span` beats.
    fn straight(&mut self, clip: &ClipRecord, span: usize, mode: SegmentMode, outcome: &mut PlanOutcome) {
        if let Some((start, end)) = self.timeline.span(self.cursor.beat_index, span) {
            outcome
                .plans
                .push(Self::base_plan(clip, span, start, end, mode));
        }
        self.cursor.advance(span);
    }

    /// One continuous cut from the clip start, clamped to its length.
    fn long_cut(&mut self, clip: &ClipRecord, span: usize, outcome: &mut PlanOutcome) {
        if let Some((start, end)) = self.timeline.span(self.cursor.beat_index, span) {
            let mut plan = Self::base_plan(clip, span, start, end, SegmentMode::LongCut);
            let length = (end - start).min(clip.duration);
            if let Ok(range) = SourceRange::new(0.0, length) {
                plan.sub_segments.push(range);
                outcome.plans.push(plan);
            }
        }
        self.cursor.advance(span);
    }

    /// Evenly spaced flash segments sampled across the whole clip.
    fn flash_set(&mut self, clip: &ClipRecord, span: usize, outcome: &mut PlanOutcome) {
        if let Some((start, end)) = self.timeline.span(self.cursor.beat_index, span) {
            let layout = flash_layout(clip.duration, start, end, self.config.flash_segments);
            if layout.is_empty() {
                warn!(
                    clip = %clip.file_name,
                    beat_index = self.cursor.beat_index,
                    segment_duration = layout.segment_duration,
                    spacing = layout.spacing,
                    "Clip too short for a flash set, dropping step"
                );
                outcome.dropped.push(DroppedStep {
                    clip_id: clip.id,
                    file_name: clip.file_name.clone(),
                    beat_index: self.cursor.beat_index,
                    beat_span: span,
                    segment_duration: layout.segment_duration,
                    spacing: layout.spacing,
                });
            } else {
                let mut plan = Self::base_plan(clip, span, start, end, SegmentMode::FlashSet);
                plan.sub_segments = layout.segments;
                outcome.plans.push(plan);
            }
        }
        self.cursor.advance(span);
    }

    /// Two clips, each holding half of the current beat interval.
    fn half_beat(&mut self, first: ClipRecord, pool: &mut ClipPool, outcome: &mut PlanOutcome) -> StepFlow {
        let Some((start, end)) = self.timeline.interval(self.cursor.beat_index) else {
            self.cursor.advance(2);
            return StepFlow::Continue;
        };
        let middle = start + (end - start) / 2.0;

        outcome
            .plans
            .push(Self::base_plan(&first, 1, start, middle, SegmentMode::Half));
        self.cursor.advance(1);

        let Some(second) = pool.claim_next() else {
            info!(
                beat_index = self.cursor.beat_index,
                "Pool ran out during a half-beat pair"
            );
            return StepFlow::Exhausted;
        };

        if second.has_usable_duration() {
            outcome
                .plans
                .push(Self::base_plan(&second, 1, middle, end, SegmentMode::Half));
        } else {
            self.skip(&second, "source duration is not usable", outcome);
        }
        self.cursor.advance(1);
        StepFlow::Continue
    }
}
