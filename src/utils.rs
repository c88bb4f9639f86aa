//! Utility functions for file enumeration and path handling

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Enumerate all files under `dir` carrying the given extension
///
/// The extension is compared case-insensitively and without the dot.
/// Order is directory-walk order; callers must not assume it is sorted or
/// stable across filesystems.
pub fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && has_extension(entry.path(), ext))
        .map(|entry| entry.into_path())
        .collect()
}

/// Whether a path's extension equals `ext` (case-insensitive, no dot)
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}
