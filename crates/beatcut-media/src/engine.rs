//! Media engine: the primitive edits the realizer composes.
//!
//! [`FfmpegEngine`] drives the FFmpeg CLI. Tests substitute their own
//! [`MediaEngine`] to exercise the pipeline without FFmpeg.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info};

use beatcut_models::{EncodingConfig, SourceRange};

use crate::audio::{extract_soundtrack, SilenceTrimConfig, Soundtrack};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::move_file;
use crate::probe::get_duration;

/// Primitive media operations.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Length of a media file in seconds.
    async fn duration(&self, path: &Path) -> MediaResult<f64>;

    /// Cut `range` out of `source` into `output`, without audio.
    async fn trim(&self, source: &Path, range: SourceRange, output: &Path) -> MediaResult<()>;

    /// Join `segments` in order.
    async fn concatenate(&self, segments: &[PathBuf], output: &Path) -> MediaResult<()>;

    /// Replace the audio of `video` with `audio`.
    async fn attach_audio(&self, video: &Path, audio: &Path, output: &Path) -> MediaResult<()>;

    /// Write the finished video to its final location.
    async fn export(&self, composed: &Path, output: &Path) -> MediaResult<()>;

    /// Pull the audio track of `video` into an MP3 soundtrack.
    async fn extract_soundtrack(
        &self,
        video: &Path,
        output: &Path,
        silence: &SilenceTrimConfig,
    ) -> MediaResult<Soundtrack>;
}

/// [`MediaEngine`] backed by the FFmpeg CLI.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine {
    encoding: EncodingConfig,
    runner: FfmpegRunner,
}

impl FfmpegEngine {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            encoding,
            runner: FfmpegRunner::new(),
        }
    }

    /// Kill running FFmpeg processes when the signal flips.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.runner = self.runner.with_cancel(cancel_rx);
        self
    }

    /// Per-command timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }

    pub fn encoding(&self) -> &EncodingConfig {
        &self.encoding
    }

    pub fn runner(&self) -> &FfmpegRunner {
        &self.runner
    }

    fn trim_command(&self, source: &Path, range: SourceRange, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(source, output)
            .seek(range.start)
            .duration(range.duration())
            .no_audio()
            .video_filter(self.encoding.normalize_filter())
            .output_args(self.encoding.to_video_args())
            .output_args(["-avoid_negative_ts", "make_zero"])
    }

    fn attach_audio_command(&self, video: &Path, audio: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(video, output)
            .add_input(audio)
            .map("0:v:0")
            .map("1:a:0")
            .video_codec("copy")
            .output_args(self.encoding.to_audio_args())
            .output_arg("-shortest")
    }
}

/// Concat demuxer list; single quotes in paths are escaped.
pub fn concat_list_content(segments: &[PathBuf]) -> String {
    segments
        .iter()
        .map(|p| {
            let escaped = p.to_string_lossy().replace('\'', "'\\''");
            format!("file '{}'\n", escaped)
        })
        .collect()
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn duration(&self, path: &Path) -> MediaResult<f64> {
        get_duration(path).await
    }

    async fn trim(&self, source: &Path, range: SourceRange, output: &Path) -> MediaResult<()> {
        if range.duration() <= 0.0 {
            return Err(MediaError::invalid_media(format!(
                "empty range {:.3}-{:.3} of {}",
                range.start,
                range.end,
                source.display()
            )));
        }
        debug!(
            source = %source.display(),
            start = range.start,
            end = range.end,
            "Trimming segment"
        );
        self.runner
            .run(&self.trim_command(source, range, output))
            .await
    }

    async fn concatenate(&self, segments: &[PathBuf], output: &Path) -> MediaResult<()> {
        if segments.is_empty() {
            return Err(MediaError::NothingToExport);
        }
        let list = output.with_extension("concat.txt");
        tokio::fs::write(&list, concat_list_content(segments)).await?;

        let cmd = FfmpegCommand::new(&list, output).concat_list().stream_copy();
        let result = self.runner.run(&cmd).await;
        let _ = tokio::fs::remove_file(&list).await;

        info!(segments = segments.len(), "Concatenated segments");
        result
    }

    async fn attach_audio(&self, video: &Path, audio: &Path, output: &Path) -> MediaResult<()> {
        self.runner
            .run(&self.attach_audio_command(video, audio, output))
            .await
    }

    async fn export(&self, composed: &Path, output: &Path) -> MediaResult<()> {
        let staged = composed.with_file_name(format!(
            "export.{}",
            output
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("mp4")
        ));

        let cmd = FfmpegCommand::new(composed, &staged)
            .stream_copy()
            .faststart();
        self.runner
            .run_with_progress(&cmd, |progress| {
                if progress.is_complete {
                    debug!(frames = progress.frame, "Export finished writing");
                }
            })
            .await?;

        move_file(&staged, output).await?;
        info!(output = %output.display(), "Exported video");
        Ok(())
    }

    async fn extract_soundtrack(
        &self,
        video: &Path,
        output: &Path,
        silence: &SilenceTrimConfig,
    ) -> MediaResult<Soundtrack> {
        extract_soundtrack(&self.runner, video, output, silence).await
    }
}
