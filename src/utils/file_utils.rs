use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::shared::constants::{OUTPUT_CSV_SUFFIX, OUTPUT_VIDEO_SUFFIX};

/// `<dir>/<stem><suffix>` next to `input`.
pub fn sibling_with_suffix(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}", stem, suffix))
}

pub fn default_video_output(input: &Path) -> PathBuf {
    sibling_with_suffix(input, OUTPUT_VIDEO_SUFFIX)
}

pub fn default_csv_output(input: &Path) -> PathBuf {
    sibling_with_suffix(input, OUTPUT_CSV_SUFFIX)
}

/// Create the parent directory of `path` if it is missing.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_outputs_sit_next_to_input() {
        let input = Path::new("clips/session_01.mov");
        assert_eq!(default_video_output(input), Path::new("clips/session_01_pose.mp4"));
        assert_eq!(default_csv_output(input), Path::new("clips/session_01_pose.csv"));
    }

    #[test]
    fn test_default_outputs_for_bare_filename() {
        let input = Path::new("walk.mp4");
        assert_eq!(default_video_output(input), Path::new("walk_pose.mp4"));
        assert_eq!(default_csv_output(input), Path::new("walk_pose.csv"));
    }

    #[test]
    fn test_ensure_parent_dir_creates_nested() {
        let root = std::env::temp_dir().join(format!("posecast-dirs-{}", std::process::id()));
        let target = root.join("a").join("b").join("out.csv");
        ensure_parent_dir(&target).unwrap();
        assert!(root.join("a").join("b").is_dir());
        ensure_parent_dir(Path::new("no_parent.csv")).unwrap();
        let _ = fs::remove_dir_all(&root);
    }
}
