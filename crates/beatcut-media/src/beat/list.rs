//! Precomputed beat lists.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{MediaError, MediaResult};

use super::{BeatDetector, BeatTrackerConfig};

/// Parse beat times from a JSON array or from numbers separated by
/// whitespace or commas.
pub fn parse_beat_list(content: &str) -> MediaResult<Vec<f64>> {
    let trimmed = content.trim();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str::<Vec<f64>>(trimmed)?);
    }

    trimmed
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| MediaError::invalid_beat_list(format!("not a number: {:?}", token)))
        })
        .collect()
}

/// Detector that ignores the audio and returns a stored beat list.
#[derive(Debug, Clone)]
pub struct BeatListDetector {
    path: PathBuf,
}

impl BeatListDetector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> MediaResult<Vec<f64>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        parse_beat_list(&content)
    }
}

#[async_trait]
impl BeatDetector for BeatListDetector {
    async fn detect(&self, _audio: &Path, _config: &BeatTrackerConfig) -> Vec<f64> {
        match self.load().await {
            Ok(beats) => {
                info!(file = %self.path.display(), beats = beats.len(), "Loaded beat list");
                beats
            }
            Err(e) => {
                warn!(file = %self.path.display(), error = %e, "Failed to load beat list");
                Vec::new()
            }
        }
    }

    fn name(&self) -> &'static str {
        "list"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_json_array() {
        let beats = parse_beat_list("[0.5, 1.0, 1.52]\n").unwrap();
        assert_eq!(beats, vec![0.5, 1.0, 1.52]);
    }

    #[test]
    fn test_parse_separated_numbers() {
        let beats = parse_beat_list("0.5, 1.0\n1.52 2.01,\n").unwrap();
        assert_eq!(beats, vec![0.5, 1.0, 1.52, 2.01]);
        assert!(parse_beat_list("").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            parse_beat_list("0.5 one 1.5"),
            Err(MediaError::InvalidBeatList(_))
        ));
        assert!(parse_beat_list("[0.5, \"x\"]").is_err());
    }

    #[tokio::test]
    async fn test_detect_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("beats.txt");
        tokio::fs::write(&path, "0.0 0.5 1.0").await.unwrap();

        let detector = BeatListDetector::new(&path);
        let beats = detector
            .detect(Path::new("ignored.mp3"), &BeatTrackerConfig::default())
            .await;
        assert_eq!(beats, vec![0.0, 0.5, 1.0]);
    }

    #[tokio::test]
    async fn test_missing_file_yields_no_beats() {
        let detector = BeatListDetector::new("/nowhere/beats.json");
        let beats = detector
            .detect(Path::new("ignored.mp3"), &BeatTrackerConfig::default())
            .await;
        assert!(beats.is_empty());
    }
}
