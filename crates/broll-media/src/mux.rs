//! Final mux of the assembled video with the narration track.

use std::path::Path;
use tracing::info;

use broll_models::{AssembledVideo, AudioTrack, CanonicalFormat, FinalArtifact};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{file_size, remove_if_exists};

/// Combine the silent assembled video with the narration.
///
/// Video comes only from the first input and audio only from the second,
/// whatever streams either file carries. The assembled video is deleted
/// afterwards regardless of outcome.
pub async fn mux_final(
    video: AssembledVideo,
    audio: &AudioTrack,
    output: impl AsRef<Path>,
    format: &CanonicalFormat,
    timeout_secs: u64,
) -> MediaResult<FinalArtifact> {
    let output = output.as_ref();

    let result = run_mux(&video, audio, output, format, timeout_secs).await;
    remove_if_exists(&video.local_path).await;

    if result.is_err() {
        remove_if_exists(output).await;
    }
    result
}

async fn run_mux(
    video: &AssembledVideo,
    audio: &AudioTrack,
    output: &Path,
    format: &CanonicalFormat,
    timeout_secs: u64,
) -> MediaResult<FinalArtifact> {
    let cmd = FfmpegCommand::new(&video.local_path, output)
        .add_input(&audio.local_path)
        .map("0:v:0")
        .map("1:a:0")
        .video_filter(format.video_filter())
        .output_args(format.video_args())
        .output_args(format.audio_args())
        .shortest()
        .faststart();

    FfmpegRunner::new()
        .with_timeout(timeout_secs)
        .run(&cmd)
        .await
        .map_err(|e| match e {
            MediaError::FfmpegNotFound => MediaError::FfmpegNotFound,
            other => MediaError::mux_failed(other.detail()),
        })?;

    match file_size(output).await {
        Some(size) if size > 0 => {}
        _ => return Err(MediaError::mux_failed("muxer produced no output")),
    }

    info!(
        output = %output.display(),
        duration = audio.duration,
        "Muxed final video"
    );

    Ok(FinalArtifact {
        local_path: output.to_path_buf(),
        duration: audio.duration,
    })
}
