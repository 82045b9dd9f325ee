//! Per-clip normalization into the canonical format.

use std::path::Path;
use tracing::{debug, warn};

use broll_models::{AcquiredClip, CanonicalFormat, NormalizedClip};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{file_size, remove_if_exists};
use crate::probe::inspect_duration;

/// Outputs smaller than this are treated as failed transcodes.
pub const MIN_OUTPUT_BYTES: u64 = 1024;

/// Re-encode an acquired clip to the canonical format, silent, capped at
/// `max_clip_duration` seconds.
///
/// The raw input file is deleted whatever the outcome. On failure the
/// partial output is deleted too.
pub async fn normalize_clip(
    clip: AcquiredClip,
    output: impl AsRef<Path>,
    format: &CanonicalFormat,
    max_clip_duration: f64,
    timeout_secs: u64,
) -> MediaResult<NormalizedClip> {
    let output = output.as_ref();
    let cap = clip.raw_duration.min(max_clip_duration);

    let result = transcode(&clip.local_path, output, format, cap, timeout_secs).await;
    remove_if_exists(&clip.local_path).await;

    if let Err(e) = result {
        remove_if_exists(output).await;
        return Err(e);
    }

    // Probing is best-effort; the requested cap is accurate to a frame.
    let duration = match inspect_duration(output).await {
        Ok(d) => d.min(cap),
        Err(e) => {
            debug!("Could not probe normalized clip, assuming {:.3}s: {}", cap, e);
            cap
        }
    };

    Ok(NormalizedClip {
        local_path: output.to_path_buf(),
        duration,
        source_scene_index: clip.source_scene_index,
    })
}

async fn transcode(
    input: &Path,
    output: &Path,
    format: &CanonicalFormat,
    cap: f64,
    timeout_secs: u64,
) -> MediaResult<()> {
    if cap <= 0.0 {
        return Err(MediaError::transcode_failed(format!(
            "clip {} has no usable duration",
            input.display()
        )));
    }

    let cmd = FfmpegCommand::new(input, output)
        .duration(cap)
        .video_filter(format.video_filter())
        .no_audio()
        .output_args(format.video_args());

    FfmpegRunner::new()
        .with_timeout(timeout_secs)
        .run(&cmd)
        .await
        .map_err(|e| match e {
            MediaError::FfmpegNotFound => MediaError::FfmpegNotFound,
            other => {
                warn!("Normalization of {} failed: {}", input.display(), other.detail());
                MediaError::transcode_failed(other.detail())
            }
        })?;

    let size = file_size(output).await.unwrap_or(0);
    if size < MIN_OUTPUT_BYTES {
        return Err(MediaError::transcode_failed(format!(
            "output {} is only {} bytes",
            output.display(),
            size
        )));
    }

    Ok(())
}
