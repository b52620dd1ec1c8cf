//! Realizer: turns segment plans into the exported video.
//!
//! Every source range of every plan is trimmed in plan order. A range that
//! fails to trim is logged and left out; the remaining segments are joined,
//! the soundtrack is attached and the result exported. With nothing
//! realized, export is never attempted.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use beatcut_models::SegmentPlan;

use crate::engine::MediaEngine;
use crate::error::{MediaError, MediaResult};

/// A source range that could not be trimmed.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentFailure {
    pub clip_id: u64,
    pub file_name: String,
    /// Position of the range in the realization order
    pub segment_index: usize,
    pub message: String,
}

/// Outcome of a realization.
#[derive(Debug, Clone, Serialize)]
pub struct RealizeReport {
    pub output_path: PathBuf,
    pub segments_realized: usize,
    pub segments_failed: usize,
    pub failures: Vec<SegmentFailure>,
}

/// Realize `plans` into `output` with `audio` as the soundtrack.
///
/// Intermediate files are written to `work_dir`.
pub async fn realize_plans(
    engine: &dyn MediaEngine,
    plans: &[SegmentPlan],
    audio: &Path,
    output: &Path,
    work_dir: &Path,
) -> MediaResult<RealizeReport> {
    let mut segments = Vec::new();
    let mut failures = Vec::new();
    let mut segment_index = 0usize;

    for plan in plans {
        for range in plan.source_ranges() {
            let segment_path = work_dir.join(format!("seg_{:04}.mp4", segment_index));
            match engine.trim(&plan.path, range, &segment_path).await {
                Ok(()) => segments.push(segment_path),
                Err(MediaError::Cancelled) => return Err(MediaError::Cancelled),
                Err(e) => {
                    warn!(
                        clip = %plan.file_name,
                        segment_index,
                        start = range.start,
                        end = range.end,
                        error = %e,
                        "Failed to trim segment, leaving it out"
                    );
                    failures.push(SegmentFailure {
                        clip_id: plan.clip_id,
                        file_name: plan.file_name.clone(),
                        segment_index,
                        message: e.to_string(),
                    });
                }
            }
            segment_index += 1;
        }
    }

    if segments.is_empty() {
        warn!(
            plans = plans.len(),
            failed = failures.len(),
            "No segments realized, skipping export"
        );
        return Err(MediaError::NothingToExport);
    }

    let composed = work_dir.join("composed.mp4");
    engine.concatenate(&segments, &composed).await?;

    let with_audio = work_dir.join("with_audio.mp4");
    engine.attach_audio(&composed, audio, &with_audio).await?;

    engine.export(&with_audio, output).await?;

    info!(
        output = %output.display(),
        realized = segments.len(),
        failed = failures.len(),
        "Realization complete"
    );

    Ok(RealizeReport {
        output_path: output.to_path_buf(),
        segments_realized: segments.len(),
        segments_failed: failures.len(),
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SilenceTrimConfig, Soundtrack};
    use async_trait::async_trait;
    use beatcut_models::{ClipCategory, SegmentMode, SourceRange};
    use std::sync::Mutex;

    /// Records calls; trims of clips named in `failing` fail.
    #[derive(Default)]
    struct RecordingEngine {
        failing: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl RecordingEngine {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MediaEngine for RecordingEngine {
        async fn duration(&self, _path: &Path) -> MediaResult<f64> {
            Ok(5.0)
        }

        async fn trim(&self, source: &Path, range: SourceRange, _output: &Path) -> MediaResult<()> {
            let name = source.file_name().unwrap().to_string_lossy().to_string();
            self.calls
                .lock()
                .unwrap()
                .push(format!("trim {} {:.2}-{:.2}", name, range.start, range.end));
            if self.failing.contains(&name) {
                return Err(MediaError::ffmpeg_failed("corrupt", None, Some(1)));
            }
            Ok(())
        }

        async fn concatenate(&self, segments: &[PathBuf], _output: &Path) -> MediaResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("concat {}", segments.len()));
            Ok(())
        }

        async fn attach_audio(&self, _video: &Path, _audio: &Path, _output: &Path) -> MediaResult<()> {
            self.calls.lock().unwrap().push("audio".to_string());
            Ok(())
        }

        async fn export(&self, _composed: &Path, _output: &Path) -> MediaResult<()> {
            self.calls.lock().unwrap().push("export".to_string());
            Ok(())
        }

        async fn extract_soundtrack(
            &self,
            _video: &Path,
            output: &Path,
            _silence: &SilenceTrimConfig,
        ) -> MediaResult<Soundtrack> {
            Ok(Soundtrack {
                path: output.to_path_buf(),
                trimmed_start: 0.0,
            })
        }
    }

    fn plan(id: u64, start: f64, end: f64, mode: SegmentMode, sub: Vec<SourceRange>) -> SegmentPlan {
        SegmentPlan {
            clip_id: id,
            file_name: format!("IMG_{}.MOV", id),
            path: PathBuf::from(format!("/clips/IMG_{}.MOV", id)),
            category: ClipCategory::Regular,
            beat_span: 1,
            start_time: start,
            end_time: end,
            mode,
            source_duration: 1.0,
            sub_segments: sub,
        }
    }

    #[tokio::test]
    async fn test_realizes_ranges_in_plan_order() {
        let engine = RecordingEngine::default();
        let flash = vec![
            SourceRange { start: 0.0, end: 0.25 },
            SourceRange { start: 0.5, end: 0.75 },
        ];
        let plans = vec![
            plan(1, 0.0, 0.5, SegmentMode::Single, Vec::new()),
            plan(2, 0.5, 1.5, SegmentMode::FlashSet, flash),
            plan(3, 1.5, 4.0, SegmentMode::Double, Vec::new()),
        ];

        let report = realize_plans(
            &engine,
            &plans,
            Path::new("song.mp3"),
            Path::new("out.mp4"),
            Path::new("/work"),
        )
        .await
        .unwrap();

        assert_eq!(report.segments_realized, 4);
        assert_eq!(
            engine.calls(),
            vec![
                "trim IMG_1.MOV 0.00-0.50",
                "trim IMG_2.MOV 0.00-0.25",
                "trim IMG_2.MOV 0.50-0.75",
                // Clamped to the 1 s source.
                "trim IMG_3.MOV 0.00-1.00",
                "concat 4",
                "audio",
                "export",
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_segment_is_skipped() {
        let engine = RecordingEngine {
            failing: vec!["IMG_2.MOV".to_string()],
            ..Default::default()
        };
        let plans = vec![
            plan(1, 0.0, 0.5, SegmentMode::Single, Vec::new()),
            plan(2, 0.5, 1.0, SegmentMode::Single, Vec::new()),
        ];

        let report = realize_plans(
            &engine,
            &plans,
            Path::new("song.mp3"),
            Path::new("out.mp4"),
            Path::new("/work"),
        )
        .await
        .unwrap();

        assert_eq!(report.segments_realized, 1);
        assert_eq!(report.segments_failed, 1);
        assert_eq!(report.failures[0].clip_id, 2);
        assert!(engine.calls().contains(&"export".to_string()));
    }

    #[tokio::test]
    async fn test_nothing_realized_never_exports() {
        let engine = RecordingEngine {
            failing: vec!["IMG_1.MOV".to_string()],
            ..Default::default()
        };
        let plans = vec![plan(1, 0.0, 0.5, SegmentMode::Single, Vec::new())];

        let result = realize_plans(
            &engine,
            &plans,
            Path::new("song.mp3"),
            Path::new("out.mp4"),
            Path::new("/work"),
        )
        .await;

        assert!(matches!(result, Err(MediaError::NothingToExport)));
        assert!(!engine.calls().iter().any(|c| c == "export" || c.starts_with("concat")));
    }

    #[tokio::test]
    async fn test_empty_plan_list_never_exports() {
        let engine = RecordingEngine::default();
        let result = realize_plans(
            &engine,
            &[],
            Path::new("song.mp3"),
            Path::new("out.mp4"),
            Path::new("/work"),
        )
        .await;
        assert!(matches!(result, Err(MediaError::NothingToExport)));
        assert!(engine.calls().is_empty());
    }
}
