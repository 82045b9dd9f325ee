//! Timeline planning.
//!
//! Splits the narration into evenly spaced scenes and attaches the words
//! spoken around each scene start, estimated from the average speaking rate.

use broll_models::SceneDescriptor;

/// Speaking rate assumed when the duration is unusable.
pub const DEFAULT_WORDS_PER_SECOND: f64 = 2.5;

/// Words captured per snippet.
pub const DEFAULT_SNIPPET_WINDOW: usize = 6;

/// Snippet for scenes that start after the last scripted word.
pub const GENERIC_SNIPPET: &str = "healthy lifestyle";

/// Plan `scene_count` scenes over `total_duration` seconds of narration.
///
/// `words` must already be lowercased. The result is ordered by index with
/// non-decreasing timestamps starting at zero.
pub fn plan(words: &[String], total_duration: f64, scene_count: usize) -> Vec<SceneDescriptor> {
    plan_with_window(words, total_duration, scene_count, DEFAULT_SNIPPET_WINDOW)
}

/// [`plan`] with an explicit snippet window.
pub fn plan_with_window(
    words: &[String],
    total_duration: f64,
    scene_count: usize,
    window: usize,
) -> Vec<SceneDescriptor> {
    if scene_count == 0 {
        return Vec::new();
    }

    let usable = total_duration.is_finite() && total_duration > 0.0;
    let (duration, words_per_second) = if usable {
        (total_duration, words.len() as f64 / total_duration)
    } else {
        (0.0, DEFAULT_WORDS_PER_SECOND)
    };
    let spacing = duration / scene_count as f64;
    let window = window.max(1);

    (0..scene_count)
        .map(|index| {
            let timestamp = index as f64 * spacing;
            let word_index = (timestamp * words_per_second).floor() as usize;
            let snippet = if word_index < words.len() {
                let end = (word_index + window).min(words.len());
                words[word_index..end].join(" ")
            } else {
                GENERIC_SNIPPET.to_string()
            };
            SceneDescriptor::new(index, timestamp, snippet)
        })
        .collect()
}
