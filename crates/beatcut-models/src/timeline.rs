//! Beat timeline produced by the beat detector.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Ordered, immutable sequence of beat timestamps in seconds.
///
/// Timestamps are finite and strictly increasing. A timeline needs at
/// least two beats before any segment can be planned against it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
#[schemars(with = "Vec<f64>")]
pub struct BeatTimeline {
    beats: Vec<f64>,
}

impl BeatTimeline {
    /// Create a timeline, validating ordering and finiteness.
    pub fn new(beats: Vec<f64>) -> ModelResult<Self> {
        for (index, beat) in beats.iter().enumerate() {
            if !beat.is_finite() {
                return Err(ModelError::NonFinite { index });
            }
            if index > 0 && beats[index - 1] >= *beat {
                return Err(ModelError::NotIncreasing {
                    index,
                    previous: beats[index - 1],
                    current: *beat,
                });
            }
        }
        Ok(Self { beats })
    }

    /// Build a timeline from raw detector output.
    ///
    /// Non-finite values are dropped, the rest sorted and deduplicated.
    pub fn from_unsorted(mut beats: Vec<f64>) -> Self {
        beats.retain(|b| b.is_finite());
        beats.sort_by(|a, b| a.total_cmp(b));
        beats.dedup();
        Self { beats }
    }

    /// An empty timeline ("no beats").
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.beats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }

    /// Whether the timeline has enough beats for planning.
    pub fn can_plan(&self) -> bool {
        self.beats.len() >= 2
    }

    /// Timestamp of the beat at `index`.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.beats.get(index).copied()
    }

    /// The `[beat(index), beat(index + 1))` interval.
    pub fn interval(&self, index: usize) -> Option<(f64, f64)> {
        Some((self.get(index)?, self.get(index + 1)?))
    }

    /// Span from `beat(index)` to `beat(index + beats)`.
    pub fn span(&self, index: usize, beats: usize) -> Option<(f64, f64)> {
        Some((self.get(index)?, self.get(index.checked_add(beats)?)?))
    }

    /// Seconds between the first and last beat.
    pub fn duration(&self) -> f64 {
        match (self.beats.first(), self.beats.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.beats
    }

    /// Number of beat intervals left after `index`.
    pub fn remaining_intervals(&self, index: usize) -> usize {
        self.beats.len().saturating_sub(1).saturating_sub(index)
    }
}

impl TryFrom<Vec<f64>> for BeatTimeline {
    type Error = ModelError;

    fn try_from(beats: Vec<f64>) -> ModelResult<Self> {
        Self::new(beats)
    }
}

impl From<BeatTimeline> for Vec<f64> {
    fn from(timeline: BeatTimeline) -> Self {
        timeline.beats
    }
}
