//! Pipeline driver.
//!
//! Runs one stitching job in strict order: soundtrack, beats, clip pool,
//! planning, realization. A failing stage ends the run; nothing is
//! retried. Export is only reached with at least one plan.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn, Instrument};

use beatcut_media::{
    list_files_with_extensions, realize_plans, BeatDetector, BeatListDetector, MediaEngine,
    MediaError, AUDIO_EXTENSIONS, VIDEO_EXTENSIONS,
};
use beatcut_models::{parse_clip_id, BeatTimeline, PlanManifest, PlannerStatus};
use beatcut_planner::{ClipPool, ClipSource, SegmentPlanner};

use crate::config::StitchConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::RunLogger;

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct StitchReport {
    pub run_id: String,
    /// Exported video; `None` for dry runs
    pub output_path: Option<PathBuf>,
    pub manifest_path: Option<PathBuf>,
    pub status: PlannerStatus,
    pub plan_count: usize,
    pub segments_realized: usize,
    pub segments_failed: usize,
    pub seed: u64,
    pub excluded_files: Vec<String>,
    #[serde(skip)]
    pub manifest: PlanManifest,
}

/// Listed clips after probing.
struct ClipInventory {
    pool: ClipPool,
    excluded_files: Vec<String>,
}

/// Drives one stitching run.
pub struct StitchPipeline<E: MediaEngine, D: BeatDetector> {
    config: StitchConfig,
    engine: E,
    detector: D,
    cancel_rx: Option<watch::Receiver<bool>>,
    dry_run: bool,
    logger: RunLogger,
}

impl<E: MediaEngine, D: BeatDetector> StitchPipeline<E, D> {
    pub fn new(config: StitchConfig, engine: E, detector: D) -> Self {
        Self {
            config,
            engine,
            detector,
            cancel_rx: None,
            dry_run: false,
            logger: RunLogger::new("pipeline"),
        }
    }

    /// Set cancellation signal, checked between stages and by the planner.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Plan only: nothing is trimmed, exported or written.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn config(&self) -> &StitchConfig {
        &self.config
    }

    pub fn run_id(&self) -> &str {
        self.logger.run_id()
    }

    fn check_cancelled(&self) -> PipelineResult<()> {
        let cancelled = self
            .cancel_rx
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false);
        if cancelled {
            self.logger.log_warning("cancellation requested");
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }

    pub async fn run(&self) -> PipelineResult<StitchReport> {
        self.run_stages().instrument(self.logger.create_span()).await
    }

    async fn run_stages(&self) -> PipelineResult<StitchReport> {
        self.config.validate()?;
        self.logger.log_start(&format!(
            "stitching clips from {}",
            self.config.clips_dir.display()
        ));

        let soundtrack = self.resolve_soundtrack().await?;
        self.check_cancelled()?;

        let timeline = self.resolve_beats(&soundtrack).await?;
        self.check_cancelled()?;

        let ClipInventory {
            mut pool,
            excluded_files,
        } = self.build_pool().await?;
        self.check_cancelled()?;

        let seed = self.config.seed.unwrap_or_else(|| rand::rng().random());
        let plan_logger = self.logger.stage("plan");
        plan_logger.log_start(&format!(
            "{} beats, {} clips, seed {}",
            timeline.len(),
            pool.len(),
            seed
        ));

        let mut planner = SegmentPlanner::new(
            &timeline,
            self.config.planner.clone(),
            StdRng::seed_from_u64(seed),
        );
        if let Some(rx) = &self.cancel_rx {
            planner = planner.with_cancel(rx.clone());
        }
        let outcome = planner.plan(&mut pool);

        if outcome.status == PlannerStatus::Cancelled {
            return Err(PipelineError::Cancelled);
        }
        if outcome.is_empty() {
            plan_logger.log_error(&format!("no plans produced ({})", outcome.status));
            return Err(PipelineError::NoPlansProduced {
                status: outcome.status,
            });
        }
        plan_logger.log_completion(&format!(
            "{} plans, {:.2}s of footage, status {}",
            outcome.plans.len(),
            outcome.total_output_duration(),
            outcome.status
        ));

        let manifest = PlanManifest {
            generated_at: Utc::now(),
            seed,
            status: outcome.status,
            beats: timeline,
            plans: outcome.plans,
            excluded_files,
            skipped: outcome.skipped,
            dropped: outcome.dropped,
        };

        let mut report = StitchReport {
            run_id: self.logger.run_id().to_string(),
            output_path: None,
            manifest_path: None,
            status: manifest.status,
            plan_count: manifest.plans.len(),
            segments_realized: 0,
            segments_failed: 0,
            seed,
            excluded_files: manifest.excluded_files.clone(),
            manifest,
        };

        if self.dry_run {
            self.logger.log_completion("dry run, skipping realization");
            return Ok(report);
        }

        tokio::fs::create_dir_all(self.config.output_dir()).await?;
        if self.config.write_manifest {
            let path = self.config.manifest_path();
            write_manifest(&report.manifest, &path).await?;
            report.manifest_path = Some(path);
        }

        self.check_cancelled()?;
        let output = self.config.output_path();
        let realized = self.realize(&report.manifest, &soundtrack, &output).await?;
        report.output_path = Some(realized.output_path);
        report.segments_realized = realized.segments_realized;
        report.segments_failed = realized.segments_failed;

        self.logger.log_completion(&format!(
            "wrote {} ({} segments, {} failed)",
            output.display(),
            report.segments_realized,
            report.segments_failed
        ));
        Ok(report)
    }

    /// First MP3 in the audio folder, else the audio of its first video.
    async fn resolve_soundtrack(&self) -> PipelineResult<PathBuf> {
        let logger = self.logger.stage("soundtrack");
        let audio_dir = self.config.audio_dir();

        let mp3s = list_files_with_extensions(&audio_dir, AUDIO_EXTENSIONS).await?;
        if let Some(mp3) = mp3s.into_iter().next() {
            logger.log_progress(&format!("using {}", mp3.display()));
            return Ok(mp3);
        }

        let videos = list_files_with_extensions(&audio_dir, VIDEO_EXTENSIONS).await?;
        let Some(video) = videos.into_iter().next() else {
            logger.log_error(&format!("no soundtrack in {}", audio_dir.display()));
            return Err(PipelineError::MissingSoundtrack(audio_dir));
        };

        let target = video.with_extension("mp3");
        logger.log_progress(&format!(
            "extracting soundtrack from {}",
            video.display()
        ));
        let soundtrack = self
            .engine
            .extract_soundtrack(&video, &target, &self.config.silence)
            .await
            .map_err(|e| PipelineError::from_media(e, 0))?;
        if soundtrack.trimmed_start > 0.0 {
            info!(
                trimmed = soundtrack.trimmed_start,
                "Trimmed leading silence from soundtrack"
            );
        }
        Ok(soundtrack.path)
    }

    async fn resolve_beats(&self, soundtrack: &Path) -> PipelineResult<BeatTimeline> {
        let logger = self.logger.stage("beats");
        let beats = match &self.config.beats_file {
            Some(path) => {
                let list = BeatListDetector::new(path);
                logger.log_progress(&format!("reading beats from {}", path.display()));
                list.detect(soundtrack, &self.config.beat).await
            }
            None => {
                logger.log_progress(&format!("detecting beats with {}", self.detector.name()));
                self.detector.detect(soundtrack, &self.config.beat).await
            }
        };

        let raw = beats.len();
        let timeline = BeatTimeline::from_unsorted(beats);
        if timeline.len() < raw {
            warn!(
                raw,
                kept = timeline.len(),
                "Dropped duplicate or non-finite beat times"
            );
        }
        if timeline.is_empty() {
            logger.log_error("no beats detected");
            return Err(PipelineError::NoBeats(soundtrack.to_path_buf()));
        }
        logger.log_completion(&format!(
            "{} beats over {:.2}s",
            timeline.len(),
            timeline.duration()
        ));
        Ok(timeline)
    }

    /// List and probe the clip folder, then classify into a pool.
    ///
    /// Files without a clip id are handed to the pool unprobed; it
    /// excludes them by name.
    async fn build_pool(&self) -> PipelineResult<ClipInventory> {
        let logger = self.logger.stage("clips");
        let files = list_files_with_extensions(&self.config.clips_dir, VIDEO_EXTENSIONS).await?;

        let mut sources = Vec::with_capacity(files.len());
        let mut unreadable = Vec::new();
        for path in files {
            self.check_cancelled()?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            if parse_clip_id(&file_name).is_none() {
                sources.push(ClipSource::new(file_name, path, 0.0));
                continue;
            }

            match self.engine.duration(&path).await {
                Ok(duration) => {
                    debug!(file = %file_name, duration, "Probed clip");
                    sources.push(ClipSource::new(file_name, path, duration));
                }
                Err(MediaError::Cancelled) => return Err(PipelineError::Cancelled),
                Err(e) => {
                    warn!(file = %file_name, error = %e, "Excluding unreadable clip");
                    unreadable.push(file_name);
                }
            }
        }

        let pool = ClipPool::classify(sources, &self.config.long_clips, &self.config.timelapse_clips);
        for id in pool.ambiguous() {
            logger.log_warning(&format!(
                "clip {} is listed as both long and timelapse, treated as regular",
                id
            ));
        }

        let mut excluded_files = unreadable;
        excluded_files.extend(pool.excluded().iter().map(|e| e.file_name.clone()));
        excluded_files.sort();

        if pool.is_empty() {
            logger.log_error(&format!(
                "no usable clips in {}",
                self.config.clips_dir.display()
            ));
            return Err(PipelineError::NoClips(self.config.clips_dir.clone()));
        }

        logger.log_completion(&format!(
            "{} clips in pool, {} excluded",
            pool.len(),
            excluded_files.len()
        ));
        Ok(ClipInventory {
            pool,
            excluded_files,
        })
    }

    async fn realize(
        &self,
        manifest: &PlanManifest,
        soundtrack: &Path,
        output: &Path,
    ) -> PipelineResult<beatcut_media::RealizeReport> {
        let logger = self.logger.stage("realize");
        logger.log_start(&format!("{} plans", manifest.plans.len()));

        // Same filesystem as the output so export is a rename.
        let work_dir = tempfile::Builder::new()
            .prefix(".beatcut-")
            .tempdir_in(self.config.output_dir())?;

        realize_plans(
            &self.engine,
            &manifest.plans,
            soundtrack,
            output,
            work_dir.path(),
        )
        .await
        .map_err(|e| {
            let err = PipelineError::from_media(e, manifest.plans.len());
            logger.log_error(&err.to_string());
            err
        })
    }
}

async fn write_manifest(manifest: &PlanManifest, path: &Path) -> PipelineResult<()> {
    let json = serde_json::to_vec_pretty(manifest)?;
    tokio::fs::write(path, json).await?;
    info!(path = %path.display(), "Wrote plan manifest");
    Ok(())
}
