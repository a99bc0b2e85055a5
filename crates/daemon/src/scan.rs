//! Qualifying-file detection and directory sweeps.
//!
//! A file qualifies when its name ends with one of the configured video
//! extensions, compared case-insensitively. Sweeps walk a directory tree and
//! return every qualifying regular file in it; they back both the startup
//! sweep and the catch-up walk of newly created subdirectories.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Checks if a file name ends with one of `extensions` (case-insensitive).
pub fn is_qualifying(path: &Path, extensions: &[String]) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy().to_lowercase();

    extensions
        .iter()
        .any(|ext| name.ends_with(&ext.to_lowercase()))
}

/// Recursively collects qualifying files under `root`, sorted by path.
///
/// Unreadable entries are skipped. A missing root yields an empty list.
pub fn scan_for_videos(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_qualifying(path, extensions))
        .collect();

    found.sort();
    found
}
