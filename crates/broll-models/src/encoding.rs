//! Canonical output format.
//!
//! Every normalized clip, the assembled video and the final artifact share
//! one resolution, frame rate, pixel format and codec so that clips can be
//! concatenated without per-clip stream negotiation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Canonical frame width
pub const CANONICAL_WIDTH: u32 = 1920;
/// Canonical frame height
pub const CANONICAL_HEIGHT: u32 = 1080;
/// Canonical frame rate
pub const CANONICAL_FPS: u32 = 30;
/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "veryfast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 23;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "192k";
/// Default pixel format
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";

/// Canonical video format shared by all intermediate and final media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CanonicalFormat {
    /// Frame width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Frame height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Frames per second
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "veryfast", "medium")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Pixel format
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Audio codec used when muxing the narration
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
}

fn default_width() -> u32 {
    CANONICAL_WIDTH
}
fn default_height() -> u32 {
    CANONICAL_HEIGHT
}
fn default_fps() -> u32 {
    CANONICAL_FPS
}
fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_pixel_format() -> String {
    DEFAULT_PIXEL_FORMAT.to_string()
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}

impl Default for CanonicalFormat {
    fn default() -> Self {
        Self {
            width: CANONICAL_WIDTH,
            height: CANONICAL_HEIGHT,
            fps: CANONICAL_FPS,
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            pixel_format: DEFAULT_PIXEL_FORMAT.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
        }
    }
}

impl CanonicalFormat {
    /// Returns a new format with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    /// Returns a new format with updated preset.
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Scale-to-fill, center-crop, fixed frame rate filter chain.
    ///
    /// The source is scaled up until it covers the whole frame, then the
    /// overflow is cropped evenly from both sides, so no letterboxing is
    /// ever introduced.
    pub fn video_filter(&self) -> String {
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},fps={fps},setsar=1,format={pix}",
            w = self.width,
            h = self.height,
            fps = self.fps,
            pix = self.pixel_format,
        )
    }

    /// Video encoder arguments.
    pub fn video_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
            "-r".to_string(),
            self.fps.to_string(),
        ]
    }

    /// Audio encoder arguments.
    pub fn audio_args(&self) -> Vec<String> {
        vec![
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_format() {
        let format = CanonicalFormat::default();
        assert_eq!(format.width, 1920);
        assert_eq!(format.height, 1080);
        assert_eq!(format.fps, 30);
        assert_eq!(format.codec, "libx264");
    }

    #[test]
    fn test_video_filter_fills_and_crops() {
        let filter = CanonicalFormat::default().video_filter();
        assert!(filter.starts_with("scale=1920:1080:force_original_aspect_ratio=increase"));
        assert!(filter.contains("crop=1920:1080"));
        assert!(filter.contains("fps=30"));
        assert!(!filter.contains("pad="));
    }

    #[test]
    fn test_encoder_args() {
        let format = CanonicalFormat::default().with_crf(20);
        let args = format.video_args();
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"20".to_string()));

        let audio = format.audio_args();
        assert_eq!(audio, vec!["-c:a", "aac", "-b:a", "192k"]);
    }

    #[test]
    fn test_deserialize_partial() {
        let format: CanonicalFormat = serde_json::from_str(r#"{"width":1280,"height":720}"#).unwrap();
        assert_eq!(format.width, 1280);
        assert_eq!(format.fps, 30);
        assert_eq!(format.codec, "libx264");
    }
}
