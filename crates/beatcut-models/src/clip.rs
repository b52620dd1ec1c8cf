//! Source clip records and categories.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Camera-roll naming: `IMG_<digits>` followed by an extension or the end of the name.
static CLIP_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^IMG_(\d+)(?:\.|$)").expect("valid clip id pattern"));

/// Extract the numeric sort key from a clip file name.
///
/// Returns `None` for names that do not follow the `IMG_<digits>` pattern;
/// such files are excluded from the clip pool.
///
/// # Examples
/// ```
/// use beatcut_models::parse_clip_id;
/// assert_eq!(parse_clip_id("IMG_0042.MOV"), Some(42));
/// assert_eq!(parse_clip_id("holiday.mp4"), None);
/// ```
pub fn parse_clip_id(file_name: &str) -> Option<u64> {
    CLIP_ID_PATTERN
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// How a clip is cut into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClipCategory {
    /// Cut on the beat using the span patterns.
    #[default]
    Regular,
    /// Split into evenly spaced flash segments.
    Long,
    /// Held as one continuous multi-beat cut.
    Timelapse,
}

impl ClipCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipCategory::Regular => "regular",
            ClipCategory::Long => "long",
            ClipCategory::Timelapse => "timelapse",
        }
    }
}

impl std::fmt::Display for ClipCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A source clip registered in the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipRecord {
    /// Numeric id parsed from the file name (pool sort key)
    pub id: u64,
    /// File name as listed in the clips directory
    pub file_name: String,
    /// Full path to the clip
    pub path: PathBuf,
    /// Category assigned at pool construction
    pub category: ClipCategory,
    /// Reported source duration in seconds
    pub duration: f64,
}

impl ClipRecord {
    pub fn new(
        id: u64,
        file_name: impl Into<String>,
        path: impl Into<PathBuf>,
        category: ClipCategory,
        duration: f64,
    ) -> Self {
        Self {
            id,
            file_name: file_name.into(),
            path: path.into(),
            category,
            duration,
        }
    }

    /// Whether the reported duration can be cut at all.
    pub fn has_usable_duration(&self) -> bool {
        self.duration.is_finite() && self.duration > 0.0
    }
}
