//! Clip and media artifact models.
//!
//! Each pipeline stage hands the next one a value of its own type so that a
//! raw download can never be passed where a canonical clip is expected.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Provider-side descriptive metadata for a candidate clip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClipMetadata {
    /// Provider tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Free-form description (title or page slug)
    #[serde(default)]
    pub description: String,
}

impl ClipMetadata {
    /// Tags and description as one lowercased haystack for term matching.
    pub fn searchable_text(&self) -> String {
        let mut text = self.description.to_lowercase();
        for tag in &self.tags {
            text.push(' ');
            text.push_str(&tag.to_lowercase());
        }
        text
    }
}

/// A provider search result that has not been downloaded yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipCandidate {
    /// Provider name (e.g., "pexels")
    pub provider: String,

    /// Direct URL of the chosen rendition
    pub remote_url: String,

    /// Tags and description
    #[serde(default)]
    pub metadata: ClipMetadata,

    /// Rendition width in pixels
    pub width: u32,

    /// Rendition height in pixels
    pub height: u32,

    /// Clip duration in seconds as reported by the provider
    pub duration: f64,
}

impl ClipCandidate {
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// A downloaded clip in provider format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AcquiredClip {
    pub local_path: PathBuf,

    /// Duration to use from this clip, already capped to the per-clip maximum
    pub raw_duration: f64,

    pub source_scene_index: usize,

    pub provider: String,
}

/// A clip re-encoded into the canonical format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedClip {
    pub local_path: PathBuf,
    pub duration: f64,
    pub source_scene_index: usize,
}

/// Silent video built from normalized clips, exactly the target duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssembledVideo {
    pub local_path: PathBuf,
    pub duration: f64,
}

/// Narration audio decoded for muxing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioTrack {
    pub local_path: PathBuf,

    /// Target duration of the whole job, in seconds
    pub duration: f64,

    /// False when the duration came from a fallback instead of a probe
    pub measured: bool,
}

/// Muxed output video with the narration track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinalArtifact {
    pub local_path: PathBuf,
    pub duration: f64,
}
