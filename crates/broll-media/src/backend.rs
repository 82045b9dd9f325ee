//! Media backend abstraction used by the pipeline orchestrator.

use async_trait::async_trait;
use std::path::Path;

use broll_models::{
    AcquiredClip, AssembledVideo, AudioTrack, CanonicalFormat, FinalArtifact, NormalizedClip,
};

use crate::assemble::{assemble_clips, MAX_CONCAT_ENTRIES};
use crate::audio::prepare_audio;
use crate::error::MediaResult;
use crate::mux::mux_final;
use crate::normalize::normalize_clip;

/// Time and size limits for media subprocesses.
#[derive(Debug, Clone)]
pub struct MediaLimits {
    /// Longest stretch of any single clip used, in seconds
    pub max_clip_duration: f64,
    /// Concat list safety ceiling
    pub max_concat_entries: usize,
    pub audio_timeout_secs: u64,
    pub normalize_timeout_secs: u64,
    pub assemble_timeout_secs: u64,
    pub mux_timeout_secs: u64,
}

impl Default for MediaLimits {
    fn default() -> Self {
        Self {
            max_clip_duration: 4.0,
            max_concat_entries: MAX_CONCAT_ENTRIES,
            audio_timeout_secs: 120,
            normalize_timeout_secs: 120,
            assemble_timeout_secs: 300,
            mux_timeout_secs: 300,
        }
    }
}

/// Media operations needed to turn clips and narration into a video.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Decode the narration and measure the target duration.
    async fn prepare_audio(
        &self,
        input: &Path,
        output: &Path,
        duration_hint: Option<f64>,
    ) -> MediaResult<AudioTrack>;

    /// Re-encode one clip into the canonical format. Consumes the raw file.
    async fn normalize(&self, clip: AcquiredClip, output: &Path) -> MediaResult<NormalizedClip>;

    /// Concatenate clips into a silent video of exactly `target` seconds.
    /// Consumes the clip files.
    async fn assemble(
        &self,
        clips: Vec<NormalizedClip>,
        target: f64,
        output: &Path,
    ) -> MediaResult<AssembledVideo>;

    /// Mux the assembled video with the narration. Consumes the video file.
    async fn mux(
        &self,
        video: AssembledVideo,
        audio: &AudioTrack,
        output: &Path,
    ) -> MediaResult<FinalArtifact>;
}

/// [`MediaBackend`] backed by the ffmpeg and ffprobe CLIs.
#[derive(Debug, Clone, Default)]
pub struct FfmpegBackend {
    format: CanonicalFormat,
    limits: MediaLimits,
}

impl FfmpegBackend {
    pub fn new(format: CanonicalFormat, limits: MediaLimits) -> Self {
        Self { format, limits }
    }

    pub fn format(&self) -> &CanonicalFormat {
        &self.format
    }

    pub fn limits(&self) -> &MediaLimits {
        &self.limits
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    async fn prepare_audio(
        &self,
        input: &Path,
        output: &Path,
        duration_hint: Option<f64>,
    ) -> MediaResult<AudioTrack> {
        prepare_audio(input, output, duration_hint, self.limits.audio_timeout_secs).await
    }

    async fn normalize(&self, clip: AcquiredClip, output: &Path) -> MediaResult<NormalizedClip> {
        normalize_clip(
            clip,
            output,
            &self.format,
            self.limits.max_clip_duration,
            self.limits.normalize_timeout_secs,
        )
        .await
    }

    async fn assemble(
        &self,
        clips: Vec<NormalizedClip>,
        target: f64,
        output: &Path,
    ) -> MediaResult<AssembledVideo> {
        assemble_clips(
            clips,
            target,
            output,
            &self.format,
            self.limits.max_concat_entries,
            self.limits.assemble_timeout_secs,
        )
        .await
    }

    async fn mux(
        &self,
        video: AssembledVideo,
        audio: &AudioTrack,
        output: &Path,
    ) -> MediaResult<FinalArtifact> {
        mux_final(video, audio, output, &self.format, self.limits.mux_timeout_secs).await
    }
}
