//! Soundtrack extraction.
//!
//! When the audio folder only holds a video, its audio track becomes the
//! soundtrack: leading silence is detected with FFmpeg's `silencedetect`
//! and the MP3 is written from the first audible instant.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// A silence interval must start this close to zero to count as leading.
const LEADING_TOLERANCE_SECS: f64 = 0.01;

static SILENCE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"silence_start:\s*(-?[0-9]+(?:\.[0-9]+)?)").expect("valid regex")
});
static SILENCE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"silence_end:\s*(-?[0-9]+(?:\.[0-9]+)?)").expect("valid regex")
});

/// Leading-silence trimming parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilenceTrimConfig {
    /// Level below which audio counts as silence (dBFS)
    pub threshold_db: f64,

    /// Shortest stretch of quiet that counts as silence (milliseconds)
    pub min_silence_ms: u64,

    /// Disable to keep the soundtrack untrimmed
    pub enabled: bool,
}

impl Default for SilenceTrimConfig {
    fn default() -> Self {
        Self {
            threshold_db: -50.0,
            min_silence_ms: 500,
            enabled: true,
        }
    }
}

impl SilenceTrimConfig {
    /// Builder-style setter for the silence threshold.
    pub fn with_threshold_db(mut self, threshold_db: f64) -> Self {
        self.threshold_db = threshold_db.min(0.0);
        self
    }

    /// Builder-style setter for minimum silence duration.
    pub fn with_min_silence_ms(mut self, ms: u64) -> Self {
        self.min_silence_ms = ms;
        self
    }

    /// Disable trimming.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// `silencedetect` filter for these parameters.
    pub fn detect_filter(&self) -> String {
        format!(
            "silencedetect=noise={}dB:d={:.3}",
            self.threshold_db,
            self.min_silence_ms as f64 / 1000.0
        )
    }
}

/// Leading silence found in a `silencedetect` log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LeadingSilence {
    /// Audio starts right away
    None,
    /// Audible from this many seconds in
    Until(f64),
    /// Nothing rises above the threshold
    Entire,
}

/// Parse FFmpeg `silencedetect` output for silence at the start.
pub fn parse_leading_silence(stderr: &str) -> LeadingSilence {
    let Some(start) = SILENCE_START
        .captures(stderr)
        .and_then(|c| c[1].parse::<f64>().ok())
    else {
        return LeadingSilence::None;
    };

    if start > LEADING_TOLERANCE_SECS {
        return LeadingSilence::None;
    }

    match SILENCE_END
        .captures(stderr)
        .and_then(|c| c[1].parse::<f64>().ok())
    {
        Some(end) if end > 0.0 => LeadingSilence::Until(end),
        Some(_) => LeadingSilence::None,
        None => LeadingSilence::Entire,
    }
}

/// The extracted soundtrack.
#[derive(Debug, Clone)]
pub struct Soundtrack {
    pub path: PathBuf,
    /// Seconds cut from the start of the source audio
    pub trimmed_start: f64,
}

/// Extract `video`'s audio into `output` as MP3, trimming leading silence.
pub async fn extract_soundtrack(
    runner: &FfmpegRunner,
    video: &Path,
    output: &Path,
    config: &SilenceTrimConfig,
) -> MediaResult<Soundtrack> {
    let trimmed_start = if config.enabled {
        let detect = FfmpegCommand::new(video, "-")
            .without_progress()
            .log_level("info")
            .no_video()
            .audio_filter(config.detect_filter())
            .output_args(["-f", "null"]);
        let log = runner.output(&detect).await?;

        match parse_leading_silence(&log.stderr) {
            LeadingSilence::None => 0.0,
            LeadingSilence::Until(end) => end,
            LeadingSilence::Entire => {
                warn!(
                    source = %video.display(),
                    threshold_db = config.threshold_db,
                    "Soundtrack is silent throughout, keeping it untrimmed"
                );
                0.0
            }
        }
    } else {
        0.0
    };

    let mut cmd = FfmpegCommand::new(video, output);
    if trimmed_start > 0.0 {
        cmd = cmd.seek(trimmed_start);
    }
    let cmd = cmd
        .no_video()
        .audio_codec("libmp3lame")
        .output_args(["-q:a", "2"]);
    runner.run(&cmd).await?;

    info!(
        source = %video.display(),
        output = %output.display(),
        trimmed_start,
        "Extracted soundtrack"
    );

    Ok(Soundtrack {
        path: output.to_path_buf(),
        trimmed_start,
    })
}
