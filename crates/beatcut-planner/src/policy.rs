//! Span pattern policy and the per-clip handling chain.
//!
//! Every claimed clip runs through one ordered chain; the first matching
//! rule decides how it is cut:
//!
//! 1. `Long` category: flash set over the long span
//! 2. `Timelapse` category: continuous long cut
//! 3. `Regular` clip hit by the long cut roll: continuous long cut
//! 4. `Regular` clip: span pattern from the streak policy
//!
//! Multi-beat handlings are clamped to the beats left on the timeline.

use rand::Rng;
use serde::{Deserialize, Serialize};

use beatcut_models::{ClipCategory, ClipRecord};

use crate::config::{PatternWeights, PlannerConfig};

/// How many beats a regular clip covers, and with how many clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanPattern {
    SingleBeat,
    TwoBeat,
    HalfBeat,
}

/// Decision for one claimed clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    FlashSet { span: usize },
    LongCut { span: usize },
    Pattern(SpanPattern),
}

impl Handling {
    /// Beats the cursor advances by once this handling is applied.
    pub fn span(&self) -> usize {
        match self {
            Handling::FlashSet { span } | Handling::LongCut { span } => *span,
            Handling::Pattern(SpanPattern::SingleBeat) => 1,
            Handling::Pattern(SpanPattern::TwoBeat) | Handling::Pattern(SpanPattern::HalfBeat) => 2,
        }
    }

    /// Whether this handling continues a single-beat streak.
    pub fn extends_streak(&self) -> bool {
        matches!(self, Handling::Pattern(SpanPattern::SingleBeat))
    }
}

/// Draw a span pattern from the weighted distribution.
pub fn draw_pattern<R: Rng>(weights: &PatternWeights, rng: &mut R) -> SpanPattern {
    let roll = rng.random::<f64>() * weights.total();
    if roll < weights.single_beat {
        SpanPattern::SingleBeat
    } else if roll < weights.single_beat + weights.two_beat {
        SpanPattern::TwoBeat
    } else {
        SpanPattern::HalfBeat
    }
}

/// Pick the span pattern for a regular clip.
///
/// Below the streak length the pattern is forced to `SingleBeat`. Once the
/// streak completes a pattern is drawn and the streak counter restarts,
/// whatever the draw. `TwoBeat` needs two beats left and otherwise falls
/// back to `SingleBeat`.
pub fn next_pattern<R: Rng>(
    streak: &mut usize,
    remaining_beats: usize,
    config: &PlannerConfig,
    rng: &mut R,
) -> SpanPattern {
    if *streak < config.streak_length {
        return SpanPattern::SingleBeat;
    }

    *streak = 0;
    match draw_pattern(&config.pattern_weights, rng) {
        SpanPattern::TwoBeat if remaining_beats < 2 => SpanPattern::SingleBeat,
        pattern => pattern,
    }
}

/// Run the handling chain for a freshly claimed clip.
pub fn resolve_handling<R: Rng>(
    clip: &ClipRecord,
    remaining_beats: usize,
    streak: &mut usize,
    config: &PlannerConfig,
    rng: &mut R,
) -> Handling {
    let long_span = config.long_span.min(remaining_beats).max(1);

    match clip.category {
        ClipCategory::Long => Handling::FlashSet { span: long_span },
        ClipCategory::Timelapse => Handling::LongCut { span: long_span },
        ClipCategory::Regular => {
            if rng.random::<f64>() < config.long_cut_probability {
                Handling::LongCut { span: long_span }
            } else {
                Handling::Pattern(next_pattern(streak, remaining_beats, config, rng))
            }
        }
    }
}
