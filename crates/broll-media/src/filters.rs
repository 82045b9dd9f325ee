//! FFmpeg filter and concat-list helpers.

use std::path::Path;

use broll_models::CanonicalFormat;

/// Canonical filter chain, optionally extended with a freeze-frame pad.
///
/// `pad_secs` clones the last frame for that many seconds, used when the
/// concat list was capped and cannot cover the whole target.
pub fn assembly_filter(format: &CanonicalFormat, pad_secs: f64) -> String {
    let base = format.video_filter();
    if pad_secs > 0.0 {
        format!("{},{}", base, tpad_clone(pad_secs))
    } else {
        base
    }
}

/// Freeze the last frame for `seconds`.
pub fn tpad_clone(seconds: f64) -> String {
    format!("tpad=stop_mode=clone:stop_duration={:.3}", seconds)
}

/// Quote a path for an FFmpeg concat demuxer list.
///
/// The demuxer uses shell-like single quoting, so an embedded quote becomes
/// `'\''`.
pub fn concat_entry(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', "'\\''");
    format!("file '{}'", escaped)
}

/// Render a concat demuxer list for `paths`, in order.
pub fn concat_list<'a, I>(paths: I) -> String
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut list = String::from("ffconcat version 1.0\n");
    for path in paths {
        list.push_str(&concat_entry(path));
        list.push('\n');
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_concat_entry_escapes_quotes() {
        let path = PathBuf::from("/tmp/job/it's.mp4");
        assert_eq!(concat_entry(&path), "file '/tmp/job/it'\\''s.mp4'");
    }

    #[test]
    fn test_concat_list_preserves_order() {
        let a = PathBuf::from("/w/scene_002.mp4");
        let b = PathBuf::from("/w/scene_000.mp4");
        let list = concat_list([a.as_path(), b.as_path(), a.as_path()]);
        let lines: Vec<&str> = list.lines().collect();
        assert_eq!(lines[0], "ffconcat version 1.0");
        assert_eq!(lines[1], "file '/w/scene_002.mp4'");
        assert_eq!(lines[2], "file '/w/scene_000.mp4'");
        assert_eq!(lines[3], "file '/w/scene_002.mp4'");
    }

    #[test]
    fn test_assembly_filter_padding() {
        let format = CanonicalFormat::default();
        assert_eq!(assembly_filter(&format, 0.0), format.video_filter());
        assert!(assembly_filter(&format, 2.5).ends_with("tpad=stop_mode=clone:stop_duration=2.500"));
    }
}
