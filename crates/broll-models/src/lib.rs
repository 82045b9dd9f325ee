//! Shared data models for the b-roll assembly pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Job requests, stages and outcomes
//! - Narration scripts and timeline scenes
//! - Clip candidates and the media artifacts produced per stage
//! - The canonical output format

pub mod clip;
pub mod encoding;
pub mod job;
pub mod scene;
pub mod script;

// Re-export common types
pub use clip::{
    AcquiredClip, AssembledVideo, AudioTrack, ClipCandidate, ClipMetadata, FinalArtifact,
    NormalizedClip,
};
pub use encoding::CanonicalFormat;
pub use job::{
    AudioSource, JobId, JobOutcome, JobRequest, JobStage, RequestError, DEFAULT_AUDIO_DURATION_SECS,
};
pub use scene::SceneDescriptor;
pub use script::ScriptText;
