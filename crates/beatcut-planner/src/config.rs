//! Planner policy configuration.

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, PlannerResult};

/// Relative weights of the span patterns drawn after a completed streak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternWeights {
    pub single_beat: f64,
    pub two_beat: f64,
    pub half_beat: f64,
}

impl Default for PatternWeights {
    fn default() -> Self {
        Self {
            single_beat: 0.5,
            two_beat: 0.25,
            half_beat: 0.25,
        }
    }
}

impl PatternWeights {
    pub fn total(&self) -> f64 {
        self.single_beat + self.two_beat + self.half_beat
    }
}

/// Configuration for the segment planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Consecutive single-beat cuts forced before a pattern is drawn
    pub streak_length: usize,

    /// Weights of the pattern draw
    pub pattern_weights: PatternWeights,

    /// Chance that a regular clip is held as a long cut instead (0.0-1.0)
    pub long_cut_probability: f64,

    /// Beats covered by flash sets and long cuts
    pub long_span: usize,

    /// Number of flash segments cut from a long clip
    pub flash_segments: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            streak_length: 4,
            pattern_weights: PatternWeights::default(),
            long_cut_probability: 0.3,
            long_span: 2,
            flash_segments: 4,
        }
    }
}

impl PlannerConfig {
    /// Builder-style setter for the long cut probability.
    pub fn with_long_cut_probability(mut self, probability: f64) -> Self {
        self.long_cut_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// Builder-style setter for the streak length.
    pub fn with_streak_length(mut self, streak_length: usize) -> Self {
        self.streak_length = streak_length;
        self
    }

    /// Builder-style setter for the pattern weights.
    pub fn with_pattern_weights(mut self, weights: PatternWeights) -> Self {
        self.pattern_weights = weights;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> PlannerResult<()> {
        let weights = [
            self.pattern_weights.single_beat,
            self.pattern_weights.two_beat,
            self.pattern_weights.half_beat,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(PlannerError::invalid_config(
                "pattern weights must be finite and non-negative",
            ));
        }
        if self.pattern_weights.total() <= 0.0 {
            return Err(PlannerError::invalid_config(
                "at least one pattern weight must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.long_cut_probability) {
            return Err(PlannerError::invalid_config(format!(
                "long cut probability {} is outside 0.0-1.0",
                self.long_cut_probability
            )));
        }
        if self.long_span == 0 {
            return Err(PlannerError::invalid_config("long span must be at least 1 beat"));
        }
        if self.flash_segments < 2 {
            return Err(PlannerError::invalid_config(
                "flash sets need at least 2 segments",
            ));
        }
        Ok(())
    }
}
