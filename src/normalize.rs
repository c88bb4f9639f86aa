//! Image normalization pass
//!
//! Post-processes a directory of extracted images: prunes unwanted
//! resolution variants by dimension, collapses duplicate raw variants of
//! the same logical asset to one canonical name, and (for one category)
//! derives thumbnails from full-size sources.
//!
//! A single bad file never aborts the batch: decode failures leave the
//! file untouched (deletion requires positive proof of wrong size), and
//! individual delete/rename failures are logged and counted while
//! processing continues. These functions do blocking file and image I/O;
//! the pipeline runs them under `spawn_blocking`.

use crate::error::Result;
use crate::types::{NormalizeStats, ThumbnailSpec};
use crate::utils::has_extension;
use image::ImageReader;
use image::imageops::FilterType;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{info, warn};

/// Matches the disambiguation marker raw variants carry (`_#` + digits)
#[allow(clippy::expect_used)]
static DUPLICATE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_#\d+").expect("duplicate marker pattern is valid"));

/// Normalize the direct children of an image directory
///
/// For each `.png` child (subdirectories and other files are skipped, no
/// recursion):
/// - if `min_dimension > 0` and **both** width and height differ from it,
///   the file is deleted. A file matching on exactly one axis is kept;
/// - otherwise, a filename carrying the `_#<digits>` marker is renamed to
///   its canonical name with the marker stripped. When the canonical file
///   already exists and the filename matches `exclusion`, the rename is
///   skipped; otherwise the last writer among duplicates wins.
///
/// Returns aggregate counts for reporting.
pub fn normalize(
    dir: &Path,
    min_dimension: u32,
    exclusion: Option<&Regex>,
) -> Result<NormalizeStats> {
    let mut stats = NormalizeStats::default();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() || !has_extension(&path, "png") {
            continue;
        }
        stats.total += 1;

        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
            continue;
        };

        if min_dimension > 0 {
            match read_dimensions(&path) {
                // Both axes must mismatch for deletion; one matching axis
                // keeps the file.
                Some((w, h)) if w != min_dimension && h != min_dimension => {
                    match fs::remove_file(&path) {
                        Ok(()) => stats.deleted += 1,
                        Err(e) => warn!(file = %name, error = %e, "failed to delete file"),
                    }
                    continue;
                }
                Some(_) => {}
                // Cannot verify the size; do not delete.
                None => continue,
            }
        }

        if DUPLICATE_MARKER.is_match(&name) {
            let canonical = DUPLICATE_MARKER.replace_all(&name, "").into_owned();
            let canonical_path = dir.join(&canonical);

            if canonical_path.exists()
                && exclusion.is_some_and(|pattern| pattern.is_match(&name))
            {
                continue;
            }

            match fs::rename(&path, &canonical_path) {
                Ok(()) => stats.renamed += 1,
                Err(e) => warn!(file = %name, error = %e, "failed to rename file"),
            }
        }
    }

    info!(
        dir = %dir.display(),
        renamed = stats.renamed,
        deleted = stats.deleted,
        total = stats.total,
        "normalized image directory"
    );
    Ok(stats)
}

/// Size-emitting normalization variant
///
/// Strips the first `_`-delimited suffix segment regardless of the
/// duplicate marker, drops images whose dimensions are not exactly
/// `expected × expected`, renames the surviving full-size image with the
/// qualifier suffix, and derives a `thumb × thumb` thumbnail from it via
/// Catmull-Rom resampling, written under the bare canonical name. The
/// category ships both a full-resolution and a thumbnail asset from a
/// single source image.
///
/// Files without a `_` suffix, or already carrying the qualifier suffix,
/// are considered processed and skipped, so a second pass is a no-op.
pub fn normalize_sized(dir: &Path, spec: &ThumbnailSpec) -> Result<NormalizeStats> {
    let mut stats = NormalizeStats::default();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() || !has_extension(&path, "png") {
            continue;
        }
        stats.total += 1;

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some((base, suffix)) = stem.split_once('_') else {
            continue;
        };
        if suffix == spec.qualifier {
            continue;
        }
        let base = base.to_string();

        match read_dimensions(&path) {
            Some((w, h)) if w == spec.expected && h == spec.expected => {}
            Some(_) => {
                match fs::remove_file(&path) {
                    Ok(()) => stats.deleted += 1,
                    Err(e) => warn!(file = %path.display(), error = %e, "failed to delete file"),
                }
                continue;
            }
            None => continue,
        }

        let full_path = dir.join(format!("{base}_{}.png", spec.qualifier));
        if let Err(e) = fs::rename(&path, &full_path) {
            warn!(file = %path.display(), error = %e, "failed to rename full-size image");
            continue;
        }

        match image::open(&full_path) {
            Ok(img) => {
                let thumb = img.resize_exact(spec.thumb, spec.thumb, FilterType::CatmullRom);
                match thumb.save(dir.join(format!("{base}.png"))) {
                    Ok(()) => stats.renamed += 1,
                    Err(e) => {
                        warn!(file = %full_path.display(), error = %e, "failed to write thumbnail")
                    }
                }
            }
            Err(e) => warn!(file = %full_path.display(), error = %e, "failed to decode image"),
        }
    }

    info!(
        dir = %dir.display(),
        renamed = stats.renamed,
        deleted = stats.deleted,
        total = stats.total,
        "normalized sized image directory"
    );
    Ok(stats)
}

/// Read width and height from the image header without decoding pixels
///
/// Returns `None` when the header cannot be decoded; callers treat that as
/// "cannot verify, do not delete".
fn read_dimensions(path: &Path) -> Option<(u32, u32)> {
    let reader = match ImageReader::open(path).and_then(|r| r.with_guessed_format()) {
        Ok(reader) => reader,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "error opening image, skipping");
            return None;
        }
    };
    match reader.into_dimensions() {
        Ok(dims) => Some(dims),
        Err(e) => {
            warn!(file = %path.display(), error = %e, "error decoding image, skipping");
            None
        }
    }
}
