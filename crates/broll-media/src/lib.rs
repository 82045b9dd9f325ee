//! FFmpeg CLI wrapper for the b-roll pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Progress parsing from `-progress pipe:2`
//! - Bounded subprocess execution (timeouts, kill on drop)
//! - Media inspection, clip normalization, assembly and final muxing

pub mod assemble;
pub mod audio;
pub mod backend;
pub mod command;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod mux;
pub mod normalize;
pub mod probe;
pub mod progress;

pub use assemble::{assemble_clips, plan_assembly, AssemblyPlan, MAX_CONCAT_ENTRIES};
pub use audio::{decode_audio, fallback_duration, prepare_audio};
pub use backend::{FfmpegBackend, MediaBackend, MediaLimits};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use mux::mux_final;
pub use normalize::{normalize_clip, MIN_OUTPUT_BYTES};
pub use probe::{inspect_duration, probe_video, VideoInfo};
pub use progress::FfmpegProgress;
