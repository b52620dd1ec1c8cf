//! Stitcher configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use beatcut_media::{BeatTrackerConfig, SilenceTrimConfig};
use beatcut_models::EncodingConfig;
use beatcut_planner::PlannerConfig;

use crate::error::{PipelineError, PipelineResult};

pub const DEFAULT_OUTPUT_FILE_NAME: &str = "stitched_video.mp4";
pub const DEFAULT_AUDIO_SUBDIR: &str = "Audio";
pub const DEFAULT_FFMPEG_TIMEOUT_SECS: u64 = 600;

/// Configuration of one stitching run.
#[derive(Debug, Clone)]
pub struct StitchConfig {
    /// Folder holding the source clips
    pub clips_dir: PathBuf,
    /// Folder holding the soundtrack (defaults to `<clips_dir>/Audio`)
    pub audio_dir: Option<PathBuf>,
    /// Folder receiving the output (defaults to `clips_dir`)
    pub output_dir: Option<PathBuf>,
    pub output_file_name: String,
    /// Clip names handled as flash sets
    pub long_clips: Vec<String>,
    /// Clip names handled as straight long cuts
    pub timelapse_clips: Vec<String>,
    /// Precomputed beat list used instead of the detector
    pub beats_file: Option<PathBuf>,
    /// Planner seed; random when unset
    pub seed: Option<u64>,
    pub planner: PlannerConfig,
    pub encoding: EncodingConfig,
    pub silence: SilenceTrimConfig,
    pub beat: BeatTrackerConfig,
    pub ffmpeg_timeout_secs: u64,
    /// Write `<output>.plan.json` next to the output
    pub write_manifest: bool,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            clips_dir: PathBuf::from("."),
            audio_dir: None,
            output_dir: None,
            output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
            long_clips: Vec::new(),
            timelapse_clips: Vec::new(),
            beats_file: None,
            seed: None,
            planner: PlannerConfig::default(),
            encoding: EncodingConfig::default(),
            silence: SilenceTrimConfig::default(),
            beat: BeatTrackerConfig::default(),
            ffmpeg_timeout_secs: DEFAULT_FFMPEG_TIMEOUT_SECS,
            write_manifest: true,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl StitchConfig {
    pub fn new(clips_dir: impl Into<PathBuf>) -> Self {
        Self {
            clips_dir: clips_dir.into(),
            ..Default::default()
        }
    }

    /// Defaults overridden by `BEATCUT_*` environment variables.
    pub fn from_env(clips_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::new(clips_dir);

        config.planner.long_cut_probability =
            env_or("BEATCUT_LONG_CUT_PROBABILITY", config.planner.long_cut_probability);
        config.planner.streak_length = env_or("BEATCUT_STREAK_LENGTH", config.planner.streak_length);
        config.planner.flash_segments =
            env_or("BEATCUT_FLASH_SEGMENTS", config.planner.flash_segments);

        config.encoding.crf = env_or("BEATCUT_CRF", config.encoding.crf);
        config.encoding.preset = env_or("BEATCUT_PRESET", config.encoding.preset.clone());
        if env_or("BEATCUT_NVENC", false) {
            config.encoding = config.encoding.with_nvenc();
        }

        config.ffmpeg_timeout_secs = env_or("BEATCUT_FFMPEG_TIMEOUT_SECS", config.ffmpeg_timeout_secs);
        config.beat.start_bpm = env_or("BEATCUT_START_BPM", config.beat.start_bpm);
        config.beat.tightness = env_or("BEATCUT_TIGHTNESS", config.beat.tightness);
        let threshold_db = env_or("BEATCUT_SILENCE_THRESHOLD_DB", config.silence.threshold_db);
        config.silence = config.silence.with_threshold_db(threshold_db);

        config
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.audio_dir
            .clone()
            .unwrap_or_else(|| self.clips_dir.join(DEFAULT_AUDIO_SUBDIR))
    }

    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.clips_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir().join(&self.output_file_name)
    }

    /// Manifest path for an output file: `<output>.plan.json`.
    pub fn manifest_path(&self) -> PathBuf {
        let mut name = self.output_path().into_os_string();
        name.push(".plan.json");
        PathBuf::from(name)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if !self.clips_dir.is_dir() {
            return Err(PipelineError::config(format!(
                "clip folder {} does not exist",
                self.clips_dir.display()
            )));
        }
        if self.output_file_name.trim().is_empty() {
            return Err(PipelineError::config("output file name is empty"));
        }
        if Path::new(&self.output_file_name).components().count() != 1 {
            return Err(PipelineError::config(format!(
                "output file name {:?} must not contain a directory",
                self.output_file_name
            )));
        }
        self.planner
            .validate()
            .map_err(|e| PipelineError::config(e.to_string()))?;
        if !(self.beat.start_bpm.is_finite() && self.beat.start_bpm > 0.0) {
            return Err(PipelineError::config(format!(
                "start BPM {} must be positive",
                self.beat.start_bpm
            )));
        }
        if self.ffmpeg_timeout_secs == 0 {
            return Err(PipelineError::config("FFmpeg timeout must be at least 1 second"));
        }
        Ok(())
    }
}
