//! Concatenation of normalized clips into a silent video of exact length.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use broll_models::{AssembledVideo, CanonicalFormat, NormalizedClip};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{assembly_filter, concat_list};
use crate::fs_utils::{file_size, remove_if_exists};

/// Safety ceiling on concat list length.
pub const MAX_CONCAT_ENTRIES: usize = 150;

/// Order in which clips are concatenated and how the result is fitted to
/// the target.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyPlan {
    /// Indices into the clip list, in concat order
    pub entries: Vec<usize>,
    /// Times the whole ordered sequence is repeated
    pub repetitions: usize,
    /// Summed duration of `entries`, before trimming
    pub raw_duration: f64,
    /// Exact output duration
    pub target: f64,
    /// Seconds of freeze-frame needed when `raw_duration < target`
    pub pad: f64,
}

impl AssemblyPlan {
    /// Seconds trimmed from the end of the concatenation.
    pub fn trim(&self) -> f64 {
        (self.raw_duration - self.target).max(0.0)
    }
}

/// Plan a concatenation of clips with the given `durations` that covers
/// `target` seconds.
///
/// When the clips together are shorter than the target, the whole ordered
/// sequence is repeated `ceil(target / total)` times (this also loops a
/// single clip). The list is truncated at `max_entries`; any shortfall left
/// by the truncation is reported as `pad`.
pub fn plan_assembly(durations: &[f64], target: f64, max_entries: usize) -> MediaResult<AssemblyPlan> {
    if durations.is_empty() {
        return Err(MediaError::NoUsableClips);
    }

    if !target.is_finite() || target <= 0.0 {
        return Err(MediaError::internal(format!(
            "target duration must be positive, got {}",
            target
        )));
    }

    let total: f64 = durations.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(MediaError::NoUsableClips);
    }

    let repetitions = if total < target {
        (target / total).ceil() as usize
    } else {
        1
    };

    let entries: Vec<usize> = (0..repetitions)
        .flat_map(|_| 0..durations.len())
        .take(max_entries.max(1))
        .collect();

    let raw_duration: f64 = entries.iter().map(|&i| durations[i]).sum();
    let pad = (target - raw_duration).max(0.0);

    Ok(AssemblyPlan {
        entries,
        repetitions,
        raw_duration,
        target,
        pad,
    })
}

/// Concatenate `clips` (sorted by scene index here) into a silent video
/// exactly `target` seconds long.
///
/// The normalized clips and the concat list are deleted afterwards whether
/// or not assembly succeeded. No output file is created when `clips` is
/// empty.
pub async fn assemble_clips(
    mut clips: Vec<NormalizedClip>,
    target: f64,
    output: impl AsRef<Path>,
    format: &CanonicalFormat,
    max_entries: usize,
    timeout_secs: u64,
) -> MediaResult<AssembledVideo> {
    let output = output.as_ref();
    clips.sort_by_key(|c| c.source_scene_index);

    let list_path = concat_list_path(output);
    let result = run_assembly(&clips, target, output, &list_path, format, max_entries, timeout_secs).await;

    remove_if_exists(&list_path).await;
    for clip in &clips {
        remove_if_exists(&clip.local_path).await;
    }

    if result.is_err() {
        remove_if_exists(output).await;
    }

    result
}

async fn run_assembly(
    clips: &[NormalizedClip],
    target: f64,
    output: &Path,
    list_path: &Path,
    format: &CanonicalFormat,
    max_entries: usize,
    timeout_secs: u64,
) -> MediaResult<AssembledVideo> {
    let durations: Vec<f64> = clips.iter().map(|c| c.duration).collect();
    let plan = plan_assembly(&durations, target, max_entries)?;

    if plan.pad > 0.0 {
        warn!(
            "Concat list capped at {} entries covers {:.2}s of {:.2}s, padding last frame",
            plan.entries.len(),
            plan.raw_duration,
            target
        );
    }

    info!(
        clips = clips.len(),
        entries = plan.entries.len(),
        repetitions = plan.repetitions,
        raw_duration = plan.raw_duration,
        target,
        trim = plan.trim(),
        "Assembling video"
    );

    let paths = concat_entries(clips, &plan.entries)?;
    let list = concat_list(paths.iter().map(PathBuf::as_path));
    tokio::fs::write(list_path, list).await?;

    let cmd = FfmpegCommand::new(list_path, output)
        .input_args(["-f", "concat", "-safe", "0"])
        .video_filter(assembly_filter(format, plan.pad))
        .no_audio()
        .output_args(format.video_args())
        .output_duration(target);

    FfmpegRunner::new()
        .with_timeout(timeout_secs)
        .run_with_progress(&cmd, move |progress| {
            debug!(
                "Assembly progress: {:.0}% ({:.1}x)",
                progress.fraction_of(target) * 100.0,
                progress.speed
            );
        })
        .await
        .map_err(|e| match e {
            MediaError::FfmpegNotFound => MediaError::FfmpegNotFound,
            other => MediaError::transcode_failed(format!("assembly failed: {}", other.detail())),
        })?;

    if file_size(output).await.unwrap_or(0) == 0 {
        return Err(MediaError::transcode_failed("assembly produced no output"));
    }

    Ok(AssembledVideo {
        local_path: output.to_path_buf(),
        duration: target,
    })
}

/// Absolute clip paths in concat order. The concat demuxer resolves
/// relative entries against the list file's directory, not the cwd.
fn concat_entries(clips: &[NormalizedClip], entries: &[usize]) -> MediaResult<Vec<PathBuf>> {
    entries
        .iter()
        .map(|&i| std::path::absolute(&clips[i].local_path).map_err(MediaError::from))
        .collect()
}

fn concat_list_path(output: &Path) -> PathBuf {
    output.with_extension("concat.txt")
}
