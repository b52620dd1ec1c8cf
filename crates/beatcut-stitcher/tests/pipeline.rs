//! Pipeline runs against an in-memory media engine and beat detector.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::watch;
use tokio_test::assert_ok;

use beatcut_media::{
    BeatDetector, BeatTrackerConfig, MediaEngine, MediaError, MediaResult, SilenceTrimConfig,
    Soundtrack,
};
use beatcut_models::{PlanManifest, SourceRange};
use beatcut_stitcher::{PipelineError, StitchConfig, StitchPipeline};

#[derive(Clone, Default)]
struct FakeEngine {
    calls: Arc<Mutex<Vec<String>>>,
    unreadable: Vec<String>,
    fail_trims: bool,
}

impl FakeEngine {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

fn name_of(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().to_string()
}

#[async_trait]
impl MediaEngine for FakeEngine {
    async fn duration(&self, path: &Path) -> MediaResult<f64> {
        let name = name_of(path);
        self.record(format!("duration {}", name));
        if self.unreadable.contains(&name) {
            return Err(MediaError::invalid_media("moov atom not found"));
        }
        Ok(3.0)
    }

    async fn trim(&self, source: &Path, range: SourceRange, _output: &Path) -> MediaResult<()> {
        self.record(format!("trim {} {:.3}-{:.3}", name_of(source), range.start, range.end));
        if self.fail_trims {
            return Err(MediaError::ffmpeg_failed("decode error", None, Some(1)));
        }
        Ok(())
    }

    async fn concatenate(&self, segments: &[PathBuf], _output: &Path) -> MediaResult<()> {
        self.record(format!("concat {}", segments.len()));
        Ok(())
    }

    async fn attach_audio(&self, _video: &Path, audio: &Path, _output: &Path) -> MediaResult<()> {
        self.record(format!("audio {}", name_of(audio)));
        Ok(())
    }

    async fn export(&self, _composed: &Path, output: &Path) -> MediaResult<()> {
        self.record(format!("export {}", name_of(output)));
        tokio::fs::write(output, b"video").await?;
        Ok(())
    }

    async fn extract_soundtrack(
        &self,
        video: &Path,
        output: &Path,
        _silence: &SilenceTrimConfig,
    ) -> MediaResult<Soundtrack> {
        self.record(format!("extract {}", name_of(video)));
        tokio::fs::write(output, b"mp3").await?;
        Ok(Soundtrack {
            path: output.to_path_buf(),
            trimmed_start: 0.4,
        })
    }
}

struct FakeDetector {
    beats: Vec<f64>,
}

#[async_trait]
impl BeatDetector for FakeDetector {
    async fn detect(&self, _audio: &Path, _config: &BeatTrackerConfig) -> Vec<f64> {
        self.beats.clone()
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Half-second beats from 0 to 8 s.
fn steady_beats() -> FakeDetector {
    FakeDetector {
        beats: (0..=16).map(|i| i as f64 * 0.5).collect(),
    }
}

/// Clip folder with six camera clips, two stray files and a soundtrack.
fn clip_folder() -> TempDir {
    let dir = TempDir::new().unwrap();
    for i in 1..=6 {
        std::fs::write(dir.path().join(format!("IMG_{}.MOV", i)), b"").unwrap();
    }
    std::fs::write(dir.path().join("holiday.mp4"), b"").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
    std::fs::create_dir(dir.path().join("Audio")).unwrap();
    std::fs::write(dir.path().join("Audio").join("song.mp3"), b"").unwrap();
    dir
}

fn config_for(dir: &TempDir) -> StitchConfig {
    StitchConfig {
        seed: Some(7),
        long_clips: vec!["IMG_3".to_string()],
        ..StitchConfig::new(dir.path())
    }
}

#[tokio::test]
async fn test_full_run_exports_and_writes_manifest() {
    let dir = clip_folder();
    let engine = FakeEngine::default();
    let pipeline = StitchPipeline::new(config_for(&dir), engine.clone(), steady_beats());

    let report = assert_ok!(pipeline.run().await);

    let output = dir.path().join("stitched_video.mp4");
    assert_eq!(report.output_path.as_deref(), Some(output.as_path()));
    assert!(output.exists());
    assert_eq!(report.seed, 7);
    assert_eq!(report.excluded_files, vec!["holiday.mp4".to_string()]);
    assert_eq!(report.segments_failed, 0);

    let manifest_path = report.manifest_path.clone().unwrap();
    let manifest: PlanManifest =
        serde_json::from_slice(&std::fs::read(&manifest_path).unwrap()).unwrap();
    assert_eq!(manifest.plans, report.manifest.plans);
    assert_eq!(manifest.beats.len(), 17);

    let ranges: usize = manifest.plans.iter().map(|p| p.source_ranges().len()).sum();
    assert_eq!(report.segments_realized, ranges);
    assert_eq!(engine.count("trim "), ranges);

    let mut seen = HashSet::new();
    for plan in &manifest.plans {
        assert!(seen.insert(plan.clip_id), "clip {} used twice", plan.clip_id);
        assert!(plan.start_time >= 0.0 && plan.end_time <= 8.0);
        assert!(plan.end_time > plan.start_time);
    }

    let calls = engine.calls();
    assert_eq!(calls.last().unwrap(), "export stitched_video.mp4");
    assert!(calls.contains(&"audio song.mp3".to_string()));
    // Unmatched names are never probed.
    assert!(!calls.contains(&"duration holiday.mp4".to_string()));
}

#[tokio::test]
async fn test_soundtrack_extracted_from_audio_video() {
    let dir = clip_folder();
    std::fs::remove_file(dir.path().join("Audio").join("song.mp3")).unwrap();
    std::fs::write(dir.path().join("Audio").join("concert.MOV"), b"").unwrap();
    let engine = FakeEngine::default();

    StitchPipeline::new(config_for(&dir), engine.clone(), steady_beats())
        .run()
        .await
        .unwrap();

    let calls = engine.calls();
    assert_eq!(calls[0], "extract concert.MOV");
    assert!(calls.contains(&"audio concert.mp3".to_string()));
    assert!(dir.path().join("Audio").join("concert.mp3").exists());
}

#[tokio::test]
async fn test_missing_soundtrack_is_terminal() {
    let dir = clip_folder();
    std::fs::remove_dir_all(dir.path().join("Audio")).unwrap();
    let engine = FakeEngine::default();

    let result = StitchPipeline::new(config_for(&dir), engine.clone(), steady_beats())
        .run()
        .await;

    assert!(matches!(result, Err(PipelineError::MissingSoundtrack(_))));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_no_beats_is_terminal() {
    let dir = clip_folder();
    let result = StitchPipeline::new(
        config_for(&dir),
        FakeEngine::default(),
        FakeDetector { beats: Vec::new() },
    )
    .run()
    .await;

    assert!(matches!(result, Err(PipelineError::NoBeats(_))));
}

#[tokio::test]
async fn test_folder_without_camera_clips_is_terminal() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("holiday.mp4"), b"").unwrap();
    std::fs::create_dir(dir.path().join("Audio")).unwrap();
    std::fs::write(dir.path().join("Audio").join("song.mp3"), b"").unwrap();

    let result = StitchPipeline::new(config_for(&dir), FakeEngine::default(), steady_beats())
        .run()
        .await;

    assert!(matches!(result, Err(PipelineError::NoClips(_))));
}

#[tokio::test]
async fn test_unreadable_clip_is_excluded() {
    let dir = clip_folder();
    let engine = FakeEngine {
        unreadable: vec!["IMG_2.MOV".to_string()],
        ..Default::default()
    };

    let report = StitchPipeline::new(config_for(&dir), engine, steady_beats())
        .run()
        .await
        .unwrap();

    assert!(report.excluded_files.contains(&"IMG_2.MOV".to_string()));
    assert!(report.manifest.plans.iter().all(|p| p.clip_id != 2));
}

#[tokio::test]
async fn test_beats_file_replaces_detector() {
    let dir = clip_folder();
    let beats_file = dir.path().join("beats.json");
    std::fs::write(&beats_file, "[0.5, 1.0, 1.5, 2.0]").unwrap();
    let config = StitchConfig {
        beats_file: Some(beats_file),
        ..config_for(&dir)
    };

    let report = StitchPipeline::new(config, FakeEngine::default(), FakeDetector { beats: Vec::new() })
        .with_dry_run(true)
        .run()
        .await
        .unwrap();

    assert_eq!(report.manifest.beats.as_slice(), &[0.5, 1.0, 1.5, 2.0]);
}

#[tokio::test]
async fn test_single_beat_produces_no_plans_and_no_export() {
    let dir = clip_folder();
    let engine = FakeEngine::default();

    let result = StitchPipeline::new(config_for(&dir), engine.clone(), FakeDetector { beats: vec![1.0] })
        .run()
        .await;

    assert!(matches!(result, Err(PipelineError::NoPlansProduced { .. })));
    assert_eq!(engine.count("trim "), 0);
    assert_eq!(engine.count("export "), 0);
    assert!(!dir.path().join("stitched_video.mp4").exists());
}

#[tokio::test]
async fn test_all_trims_failing_never_exports() {
    let dir = clip_folder();
    let engine = FakeEngine {
        fail_trims: true,
        ..Default::default()
    };

    let result = StitchPipeline::new(config_for(&dir), engine.clone(), steady_beats())
        .run()
        .await;

    assert!(matches!(result, Err(PipelineError::NoSegmentsRealized { .. })));
    assert!(engine.count("trim ") > 0);
    assert_eq!(engine.count("export "), 0);
    assert!(!dir.path().join("stitched_video.mp4").exists());
}

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let dir = clip_folder();
    let engine = FakeEngine::default();

    let report = StitchPipeline::new(config_for(&dir), engine.clone(), steady_beats())
        .with_dry_run(true)
        .run()
        .await
        .unwrap();

    assert!(report.output_path.is_none());
    assert!(report.manifest_path.is_none());
    assert!(report.plan_count > 0);
    assert_eq!(engine.count("trim "), 0);
    assert!(!dir.path().join("stitched_video.mp4.plan.json").exists());
}

#[tokio::test]
async fn test_same_seed_same_plan() {
    let dir = clip_folder();
    let first = StitchPipeline::new(config_for(&dir), FakeEngine::default(), steady_beats())
        .with_dry_run(true)
        .run()
        .await
        .unwrap();
    let second = StitchPipeline::new(config_for(&dir), FakeEngine::default(), steady_beats())
        .with_dry_run(true)
        .run()
        .await
        .unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.manifest.plans, second.manifest.plans);
}

#[tokio::test]
async fn test_output_dir_is_created() {
    let dir = clip_folder();
    let out = TempDir::new().unwrap();
    let target = out.path().join("renders");
    let config = StitchConfig {
        output_dir: Some(target.clone()),
        output_file_name: "trip.mp4".to_string(),
        write_manifest: false,
        ..config_for(&dir)
    };

    let report = StitchPipeline::new(config, FakeEngine::default(), steady_beats())
        .run()
        .await
        .unwrap();

    assert_eq!(report.output_path, Some(target.join("trip.mp4")));
    assert!(target.join("trip.mp4").exists());
    assert!(report.manifest_path.is_none());
}

#[tokio::test]
async fn test_cancelled_run_stops() {
    let dir = clip_folder();
    let engine = FakeEngine::default();
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let result = StitchPipeline::new(config_for(&dir), engine.clone(), steady_beats())
        .with_cancel(rx)
        .run()
        .await;

    assert!(matches!(result, Err(PipelineError::Cancelled)));
    assert_eq!(engine.count("trim "), 0);
}
