//! Narration audio preparation.

use std::path::Path;
use tracing::{info, warn};

use broll_models::{AudioTrack, DEFAULT_AUDIO_DURATION_SECS};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{file_size, remove_if_exists};
use crate::probe::inspect_duration;

/// Decode any FFmpeg-readable audio into 16-bit 44.1 kHz stereo PCM WAV.
pub async fn decode_audio(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    timeout_secs: u64,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::AudioDecodeFailed(format!(
            "audio file not found: {}",
            input.display()
        )));
    }

    let cmd = FfmpegCommand::new(input, output)
        .no_video()
        .output_args(["-ac", "2", "-ar", "44100", "-c:a", "pcm_s16le"]);

    let result = FfmpegRunner::new().with_timeout(timeout_secs).run(&cmd).await;

    match result {
        Ok(()) if file_size(output).await.unwrap_or(0) > 0 => Ok(()),
        Ok(()) => {
            remove_if_exists(output).await;
            Err(MediaError::AudioDecodeFailed("decoder produced no output".to_string()))
        }
        Err(MediaError::FfmpegNotFound) => Err(MediaError::FfmpegNotFound),
        Err(e) => {
            remove_if_exists(output).await;
            Err(MediaError::AudioDecodeFailed(e.detail()))
        }
    }
}

/// Decode the narration and establish the target duration.
///
/// The probed duration is authoritative. When probing fails, the caller's
/// hint is used, then [`DEFAULT_AUDIO_DURATION_SECS`].
pub async fn prepare_audio(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    duration_hint: Option<f64>,
    timeout_secs: u64,
) -> MediaResult<AudioTrack> {
    let output = output.as_ref();
    decode_audio(input, output, timeout_secs).await?;

    let (duration, measured) = match inspect_duration(output).await {
        Ok(d) => (d, true),
        Err(e) => {
            let fallback = fallback_duration(duration_hint);
            warn!(
                "Audio duration probe failed ({}), using fallback of {:.2}s",
                e, fallback
            );
            (fallback, false)
        }
    };

    info!(duration, measured, "Narration audio ready");

    Ok(AudioTrack {
        local_path: output.to_path_buf(),
        duration,
        measured,
    })
}

/// Duration used when the narration cannot be probed.
pub fn fallback_duration(duration_hint: Option<f64>) -> f64 {
    duration_hint
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(DEFAULT_AUDIO_DURATION_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_duration() {
        assert_eq!(fallback_duration(Some(72.0)), 72.0);
        assert_eq!(fallback_duration(Some(0.0)), DEFAULT_AUDIO_DURATION_SECS);
        assert_eq!(fallback_duration(None), DEFAULT_AUDIO_DURATION_SECS);
    }

    #[tokio::test]
    async fn test_missing_audio_is_decode_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = decode_audio(dir.path().join("missing.mp3"), dir.path().join("out.wav"), 5).await;
        assert!(matches!(result, Err(MediaError::AudioDecodeFailed(_))));
    }
}
