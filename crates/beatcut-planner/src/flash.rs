//! Flash-set layout for long clips.
//!
//! A long clip is not trimmed straight: its whole duration is sampled by
//! `n` equal segments separated by `n - 1` equal gaps, so the output
//! skims through the clip within the beats it was given.
//!
//! ```text
//! source: |seg|  gap  |seg|  gap  |seg|  gap  |seg|
//!         0                                   total
//! ```

use beatcut_models::SourceRange;

/// Tolerated float error before a gap counts as negative.
const SPACING_EPSILON: f64 = 1e-9;

/// Result of the flash-set computation.
#[derive(Debug, Clone, PartialEq)]
pub struct FlashLayout {
    /// Duration of each segment (`beat span / n`)
    pub segment_duration: f64,
    /// Gap between consecutive segments
    pub spacing: f64,
    /// Source ranges; empty when the layout is degenerate
    pub segments: Vec<SourceRange>,
}

impl FlashLayout {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Lay `segments` flash cuts across a clip of `total_duration` seconds.
///
/// The cuts together fill `beat_end - beat_start`. When the clip is too
/// short to hold them (negative spacing) the layout has no segments.
pub fn flash_layout(
    total_duration: f64,
    beat_start: f64,
    beat_end: f64,
    segments: usize,
) -> FlashLayout {
    let count = segments.max(2);
    let segment_duration = (beat_end - beat_start) / count as f64;
    let spacing = (total_duration - count as f64 * segment_duration) / (count - 1) as f64;

    let degenerate = !segment_duration.is_finite()
        || !spacing.is_finite()
        || segment_duration <= 0.0
        || spacing < -SPACING_EPSILON;

    if degenerate {
        return FlashLayout {
            segment_duration,
            spacing,
            segments: Vec::new(),
        };
    }

    let spacing = spacing.max(0.0);
    let stride = segment_duration + spacing;
    let segments = (0..count)
        .map(|i| {
            let start = i as f64 * stride;
            SourceRange {
                start,
                end: (start + segment_duration).min(total_duration),
            }
        })
        .filter(|range| range.end > range.start)
        .collect();

    FlashLayout {
        segment_duration,
        spacing,
        segments,
    }
}
