//! Encoding settings for trimmed segments and the exported video.
//!
//! Segments from different cameras are re-encoded into one frame size
//! and rate so the concat demuxer can join them without re-encoding.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
pub const DEFAULT_FPS: u32 = 30;

/// Codec, quality and frame settings.
///
/// Missing fields deserialize to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EncodingConfig {
    /// Segment video codec; `h264_nvenc` when hardware encoding is on
    pub codec: String,
    /// x264 speed preset
    pub preset: String,
    /// Quality (lower is better); sent as `-cq` to NVENC
    pub crf: u8,
    /// Codec of the attached soundtrack
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub use_nvenc: bool,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.into(),
            preset: "fast".into(),
            crf: 18,
            audio_codec: DEFAULT_AUDIO_CODEC.into(),
            audio_bitrate: "192k".into(),
            width: 1920,
            height: 1080,
            fps: DEFAULT_FPS,
            use_nvenc: false,
        }
    }
}

fn flag(name: &str, value: impl ToString) -> [String; 2] {
    [name.to_string(), value.to_string()]
}

impl EncodingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    /// Output frame every segment is fitted into.
    pub fn with_frame(mut self, width: u32, height: u32, fps: u32) -> Self {
        self.width = width;
        self.height = height;
        self.fps = fps;
        self
    }

    pub fn with_nvenc(mut self) -> Self {
        self.use_nvenc = true;
        self.codec = "h264_nvenc".into();
        self
    }

    /// Letterbox filter fitting any source into the output frame.
    pub fn normalize_filter(&self) -> String {
        let (w, h) = (self.width, self.height);
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={}",
            self.fps
        )
    }

    /// Arguments re-encoding a trimmed segment.
    pub fn to_video_args(&self) -> Vec<String> {
        let quality = if self.use_nvenc { "-cq" } else { "-crf" };
        [
            flag("-c:v", &self.codec),
            flag("-preset", &self.preset),
            flag(quality, self.crf),
            flag("-pix_fmt", "yuv420p"),
        ]
        .concat()
    }

    /// Arguments encoding the soundtrack when it is attached.
    pub fn to_audio_args(&self) -> Vec<String> {
        [flag("-c:a", &self.audio_codec), flag("-b:a", &self.audio_bitrate)].concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_h264_and_aac() {
        let config = EncodingConfig::new();
        assert_eq!(config.codec, "libx264");
        assert_eq!(config.audio_codec, "aac");
        assert_eq!((config.width, config.height, config.fps), (1920, 1080, 30));
    }

    #[test]
    fn test_video_args_in_order() {
        let args = EncodingConfig::default().with_crf(20).to_video_args();
        assert_eq!(
            args,
            vec!["-c:v", "libx264", "-preset", "fast", "-crf", "20", "-pix_fmt", "yuv420p"]
        );
    }

    #[test]
    fn test_nvenc_switches_quality_flag() {
        let args = EncodingConfig::default().with_nvenc().to_video_args();
        assert_eq!(&args[..2], &["-c:v", "h264_nvenc"]);
        assert!(args.contains(&"-cq".to_string()));
        assert!(!args.contains(&"-crf".to_string()));
    }

    #[test]
    fn test_audio_args() {
        assert_eq!(
            EncodingConfig::default().to_audio_args(),
            vec!["-c:a", "aac", "-b:a", "192k"]
        );
    }

    #[test]
    fn test_normalize_filter_uses_frame() {
        let filter = EncodingConfig::default().with_frame(1280, 720, 25).normalize_filter();
        assert!(filter.starts_with("scale=1280:720"));
        assert!(filter.contains("pad=1280:720"));
        assert!(filter.ends_with("fps=25"));
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: EncodingConfig = serde_json::from_str(r#"{"crf": 23}"#).unwrap();
        assert_eq!(config.crf, 23);
        assert_eq!(config.codec, DEFAULT_VIDEO_CODEC);
        assert_eq!(config.fps, DEFAULT_FPS);
    }
}
