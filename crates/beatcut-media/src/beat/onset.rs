//! Onset-envelope beat tracker.
//!
//! 1. Decode the soundtrack to mono f32 PCM with FFmpeg.
//! 2. Onset strength: positive log-energy flux per hop.
//! 3. Tempo: onset autocorrelation weighted by a log-normal prior
//!    centred on `start_bpm`.
//! 4. Beats: dynamic programming over the onset envelope; each beat
//!    scores its onset strength minus `tightness` times the squared log
//!    deviation of its gap from the tempo period.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

use super::{BeatDetector, BeatTrackerConfig};

/// Added to frame energy before the log.
const ENERGY_FLOOR: f64 = 1e-10;
/// Tempo search range (BPM).
const MIN_BPM: f64 = 30.0;
const MAX_BPM: f64 = 320.0;
/// Width of the tempo prior in octaves.
const TEMPO_PRIOR_OCTAVES: f64 = 1.0;

/// Positive log-energy flux, one value per `hop` samples.
pub fn onset_envelope(samples: &[f32], hop: usize) -> Vec<f64> {
    let hop = hop.max(1);
    let log_energy: Vec<f64> = samples
        .chunks_exact(hop)
        .map(|frame| {
            let energy = frame.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>() / hop as f64;
            (energy + ENERGY_FLOOR).ln()
        })
        .collect();

    let mut envelope = vec![0.0; log_energy.len()];
    for t in 1..log_energy.len() {
        envelope[t] = (log_energy[t] - log_energy[t - 1]).max(0.0);
    }
    envelope
}

fn autocorrelation(envelope: &[f64], max_lag: usize) -> Vec<f64> {
    (0..=max_lag)
        .map(|lag| {
            envelope
                .iter()
                .zip(envelope.iter().skip(lag))
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

/// Estimate the tempo in BPM, `None` when the envelope has no periodicity.
fn estimate_tempo(envelope: &[f64], frame_rate: f64, start_bpm: f64) -> Option<f64> {
    let min_lag = ((frame_rate * 60.0 / MAX_BPM).floor() as usize).max(1);
    let max_lag = ((frame_rate * 60.0 / MIN_BPM).ceil() as usize).min(envelope.len().saturating_sub(2));
    if max_lag <= min_lag {
        return None;
    }

    let ac = autocorrelation(envelope, max_lag + 1);
    let at = |lag: usize| ac.get(lag).copied().unwrap_or(0.0);

    let mut best: Option<(usize, f64)> = None;
    for lag in min_lag..=max_lag {
        // Integer lags straddle the true period; score the neighbourhood.
        let strength = at(lag - 1) + at(lag) + at(lag + 1);
        let bpm = 60.0 * frame_rate / lag as f64;
        let octaves = (bpm / start_bpm).log2() / TEMPO_PRIOR_OCTAVES;
        let score = strength * (-0.5 * octaves * octaves).exp();
        if score > best.map_or(0.0, |(_, s)| s) {
            best = Some((lag, score));
        }
    }
    let (lag, _) = best?;

    let (weighted, total) = (lag - 1..=lag + 1).fold((0.0, 0.0), |(w, t), l| {
        (w + l as f64 * at(l), t + at(l))
    });
    let period = if total > 0.0 { weighted / total } else { lag as f64 };
    Some(60.0 * frame_rate / period)
}

/// Onset envelope smoothed by a narrow Gaussian scaled to the period.
fn local_score(envelope: &[f64], period: f64) -> Vec<f64> {
    let radius = period.round().max(1.0) as isize;
    let window: Vec<f64> = (-radius..=radius)
        .map(|k| {
            let x = k as f64 * 32.0 / period;
            (-0.5 * x * x).exp()
        })
        .collect();

    let n = envelope.len() as isize;
    (0..n)
        .map(|i| {
            window
                .iter()
                .enumerate()
                .filter_map(|(j, w)| {
                    let idx = i + j as isize - radius;
                    (0..n).contains(&idx).then(|| envelope[idx as usize] * w)
                })
                .sum()
        })
        .collect()
}

/// Index of the last beat: the final local maximum of the cumulative
/// score that reaches half the median local maximum.
fn last_beat(cumulative: &[f64]) -> Option<usize> {
    let n = cumulative.len();
    let maxima: Vec<usize> = (1..n)
        .filter(|&i| cumulative[i] > cumulative[i - 1] && (i + 1 == n || cumulative[i] >= cumulative[i + 1]))
        .collect();
    if maxima.is_empty() {
        return None;
    }

    let mut values: Vec<f64> = maxima.iter().map(|&i| cumulative[i]).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    let median = values[values.len() / 2];

    maxima
        .into_iter()
        .filter(|&i| 2.0 * cumulative[i] > median)
        .max()
}

/// Track beats in mono PCM, returning beat times in seconds.
pub fn track_beats(samples: &[f32], sample_rate: u32, config: &BeatTrackerConfig) -> Vec<f64> {
    let hop = config.hop_length.max(1);
    let frame_rate = sample_rate as f64 / hop as f64;

    let mut envelope = onset_envelope(samples, hop);
    if envelope.len() < 2 {
        return Vec::new();
    }

    let mean = envelope.iter().sum::<f64>() / envelope.len() as f64;
    let variance = envelope.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / envelope.len() as f64;
    let std = variance.sqrt();
    if !std.is_finite() || std <= 0.0 {
        return Vec::new();
    }
    envelope.iter_mut().for_each(|v| *v /= std);

    let Some(bpm) = estimate_tempo(&envelope, frame_rate, config.start_bpm) else {
        return Vec::new();
    };
    let period = 60.0 * frame_rate / bpm;
    debug!(bpm, period_frames = period, "Estimated tempo");

    let local = local_score(&envelope, period);
    let max_local = local.iter().copied().fold(0.0, f64::max);

    let n = local.len();
    let far = (2.0 * period).round() as usize;
    let near = ((period / 2.0).round() as usize).max(1);
    let mut cumulative = vec![0.0; n];
    let mut backlink: Vec<Option<usize>> = vec![None; n];
    let mut started = false;

    for i in 0..n {
        let mut best: Option<(usize, f64)> = None;
        if i >= near {
            for prev in i.saturating_sub(far)..=i - near {
                let deviation = ((i - prev) as f64 / period).ln();
                let score = cumulative[prev] - config.tightness * deviation * deviation;
                if best.map_or(true, |(_, b)| score > b) {
                    best = Some((prev, score));
                }
            }
        }

        cumulative[i] = local[i] + best.map_or(0.0, |(_, score)| score);

        // No chaining back into the quiet lead-in.
        if !started && local[i] < 0.01 * max_local {
            backlink[i] = None;
        } else {
            started = true;
            backlink[i] = best.map(|(prev, _)| prev);
        }
    }

    let Some(last) = last_beat(&cumulative) else {
        return Vec::new();
    };

    let mut frames = vec![last];
    let mut cursor = last;
    while let Some(prev) = backlink[cursor] {
        frames.push(prev);
        cursor = prev;
    }
    frames.reverse();

    // Trim weak beats at both ends.
    let strengths: Vec<f64> = frames.iter().map(|&f| local[f]).collect();
    let rms = (strengths.iter().map(|s| s * s).sum::<f64>() / strengths.len() as f64).sqrt();
    let threshold = 0.5 * rms;
    let first_strong = strengths.iter().position(|&s| s > threshold);
    let last_strong = strengths.iter().rposition(|&s| s > threshold);

    match (first_strong, last_strong) {
        (Some(a), Some(b)) => frames[a..=b]
            .iter()
            .map(|&f| f as f64 * hop as f64 / sample_rate as f64)
            .collect(),
        _ => Vec::new(),
    }
}

/// Beat tracker running on audio decoded by FFmpeg.
#[derive(Debug, Clone, Default)]
pub struct OnsetBeatTracker {
    runner: FfmpegRunner,
}

impl OnsetBeatTracker {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }

    /// Decode `audio` to mono f32 PCM at `sample_rate`.
    pub async fn decode_pcm(&self, audio: &Path, sample_rate: u32) -> MediaResult<Vec<f32>> {
        let cmd = FfmpegCommand::new(audio, "pipe:1")
            .without_progress()
            .no_video()
            .output_args(["-ac", "1", "-ar"])
            .output_arg(sample_rate.to_string())
            .output_args(["-f", "f32le"]);
        let output = self.runner.output(&cmd).await?;

        if output.stdout.len() % 4 != 0 {
            debug!(
                bytes = output.stdout.len(),
                "PCM stream ends mid-sample, dropping the remainder"
            );
        }
        Ok(output
            .stdout
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    async fn try_detect(&self, audio: &Path, config: &BeatTrackerConfig) -> MediaResult<Vec<f64>> {
        let samples = self.decode_pcm(audio, config.sample_rate).await?;
        let sample_rate = config.sample_rate;
        let config = config.clone();

        tokio::task::spawn_blocking(move || track_beats(&samples, sample_rate, &config))
            .await
            .map_err(|e| MediaError::internal(format!("beat tracking task failed: {}", e)))
    }
}

#[async_trait]
impl BeatDetector for OnsetBeatTracker {
    async fn detect(&self, audio: &Path, config: &BeatTrackerConfig) -> Vec<f64> {
        match self.try_detect(audio, config).await {
            Ok(beats) => {
                info!(
                    audio = %audio.display(),
                    beats = beats.len(),
                    "Detected beats"
                );
                beats
            }
            Err(e) => {
                warn!(audio = %audio.display(), error = %e, "Beat detection failed");
                Vec::new()
            }
        }
    }

    fn name(&self) -> &'static str {
        "onset"
    }
}
