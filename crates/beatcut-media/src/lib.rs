//! FFmpeg CLI wrapper and media collaborators for the stitcher.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a runner with timeout and
//!   cancellation
//! - FFprobe media information
//! - The [`MediaEngine`] seam and its FFmpeg implementation
//! - Plan realization (trim, concatenate, attach soundtrack, export)
//! - Beat detection from audio or from a stored list
//! - Soundtrack extraction with leading-silence trimming

pub mod audio;
pub mod beat;
pub mod command;
pub mod engine;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod realizer;

pub use audio::{extract_soundtrack, parse_leading_silence, LeadingSilence, SilenceTrimConfig, Soundtrack};
pub use beat::{
    onset_envelope, parse_beat_list, track_beats, BeatDetector, BeatListDetector,
    BeatTrackerConfig, OnsetBeatTracker,
};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegOutput, FfmpegRunner};
pub use engine::{FfmpegEngine, MediaEngine};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{list_files_with_extensions, move_file, AUDIO_EXTENSIONS, VIDEO_EXTENSIONS};
pub use probe::{get_duration, probe_media, MediaInfo};
pub use progress::FfmpegProgress;
pub use realizer::{realize_plans, RealizeReport, SegmentFailure};
