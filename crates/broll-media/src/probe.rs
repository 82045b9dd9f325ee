//! FFprobe media inspection.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Upper bound for a single ffprobe invocation.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Video file information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Video codec
    pub codec: String,
    /// Pixel format
    pub pixel_format: String,
    /// Whether an audio stream is present
    pub has_audio: bool,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    pix_fmt: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Run ffprobe with `args` against `path` and parse its JSON output.
async fn run_ffprobe(path: &Path, args: &[&str]) -> MediaResult<FfprobeOutput> {
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let ffprobe = check_ffprobe()?;

    let output = Command::new(ffprobe)
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(PROBE_TIMEOUT, output)
        .await
        .map_err(|_| MediaError::Timeout(PROBE_TIMEOUT.as_secs()))??;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).trim().to_string()),
        });
    }

    Ok(serde_json::from_slice(&output.stdout)?)
}

/// Measure the container duration of an audio or video file in seconds.
///
/// Any failure (missing file, probe error or timeout, absent or
/// non-positive duration) is reported as [`MediaError::Unreadable`].
pub async fn inspect_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let path = path.as_ref();

    let probe = run_ffprobe(
        path,
        &["-v", "error", "-show_entries", "format=duration", "-of", "json"],
    )
    .await
    .map_err(|e| match e {
        MediaError::FfprobeNotFound => MediaError::FfprobeNotFound,
        other => MediaError::unreadable(path, other.to_string()),
    })?;

    let duration = probe
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| MediaError::unreadable(path, "no duration reported"))?;

    let duration = parse_duration(&duration)
        .ok_or_else(|| MediaError::unreadable(path, format!("invalid duration: {}", duration)))?;

    debug!(path = %path.display(), duration, "Probed media duration");
    Ok(duration)
}

/// Probe a video file for stream information.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    let probe = run_ffprobe(
        path,
        &["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"],
    )
    .await?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidVideo("No video stream found".to_string()))?;

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_duration)
        .unwrap_or(0.0);

    let fps = video_stream
        .avg_frame_rate
        .as_ref()
        .or(video_stream.r_frame_rate.as_ref())
        .and_then(|r| parse_frame_rate(r))
        .unwrap_or(0.0);

    Ok(VideoInfo {
        duration,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        fps,
        codec: video_stream.codec_name.clone().unwrap_or_default(),
        pixel_format: video_stream.pix_fmt.clone().unwrap_or_default(),
        has_audio: probe.streams.iter().any(|s| s.codec_type == "audio"),
    })
}

/// Parse a positive, finite duration in seconds.
fn parse_duration(s: &str) -> Option<f64> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert_eq!(parse_duration("72.000000"), Some(72.0));
        assert!(parse_duration("N/A").is_none());
        assert!(parse_duration("0.0").is_none());
        assert!(parse_duration("-3").is_none());
        assert!(parse_duration("inf").is_none());
    }

    #[test]
    fn test_ffprobe_json_shape() {
        let json = r#"{"format":{"duration":"4.004000"}}"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        assert!(probe.streams.is_empty());
        assert_eq!(probe.format.unwrap().duration.as_deref(), Some("4.004000"));
    }

    #[tokio::test]
    async fn test_missing_file_is_unreadable() {
        let result = inspect_duration("/nonexistent/voice.wav").await;
        assert!(matches!(
            result,
            Err(MediaError::Unreadable { .. }) | Err(MediaError::FfprobeNotFound)
        ));
    }
}
