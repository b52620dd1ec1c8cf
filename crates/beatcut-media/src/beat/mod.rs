//! Beat detection.
//!
//! Two detectors sit behind [`BeatDetector`]:
//! - [`OnsetBeatTracker`] decodes the soundtrack and tracks beats on its
//!   onset envelope
//! - [`BeatListDetector`] reads a precomputed list of beat times

mod list;
mod onset;

pub use list::{parse_beat_list, BeatListDetector};
pub use onset::{onset_envelope, track_beats, OnsetBeatTracker};

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Beat tracker parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatTrackerConfig {
    /// Tempo prior for the tempo estimate (BPM)
    pub start_bpm: f64,

    /// How strictly beats follow the estimated tempo
    pub tightness: f64,

    /// Decode sample rate (Hz)
    pub sample_rate: u32,

    /// Samples per onset frame
    pub hop_length: usize,
}

impl Default for BeatTrackerConfig {
    fn default() -> Self {
        Self {
            start_bpm: 120.0,
            tightness: 100.0,
            sample_rate: 22_050,
            hop_length: 512,
        }
    }
}

impl BeatTrackerConfig {
    /// Onset frames per second.
    pub fn frame_rate(&self) -> f64 {
        self.sample_rate as f64 / self.hop_length.max(1) as f64
    }

    /// Builder-style setter for the tempo prior.
    pub fn with_start_bpm(mut self, bpm: f64) -> Self {
        self.start_bpm = bpm;
        self
    }

    /// Builder-style setter for tightness.
    pub fn with_tightness(mut self, tightness: f64) -> Self {
        self.tightness = tightness;
        self
    }
}

/// Produces beat times (seconds) for a soundtrack.
#[async_trait]
pub trait BeatDetector: Send + Sync {
    /// Detect beats in `audio`.
    ///
    /// Failures are logged and yield an empty list.
    async fn detect(&self, audio: &Path, config: &BeatTrackerConfig) -> Vec<f64>;

    fn name(&self) -> &'static str;
}
