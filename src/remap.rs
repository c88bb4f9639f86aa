//! Staging-tree remapping
//!
//! The external extractor deposits its output under a fixed internal
//! layout (`Assets/BuiltAssets/<bundle-internal-name>/<size-qualifier>`).
//! This module moves those subtrees into the canonical asset layout and
//! deletes the consumed staging leftovers.

use crate::error::{PostProcessError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Move extracted subtrees into the canonical layout, then delete residues
///
/// Each `(source, dest)` pair is resolved against `staging_root` and
/// `dest_root` respectively and renamed. A missing source is a signal that
/// the extractor's output format changed and surfaces as
/// [`PostProcessError::MissingSourcePath`], never a silent skip.
///
/// Residue deletion happens only after every move in the batch has
/// succeeded, so a partial failure cannot destroy not-yet-moved data.
pub async fn remap(
    staging_root: &Path,
    dest_root: &Path,
    moves: &[(PathBuf, PathBuf)],
    residues: &[PathBuf],
) -> Result<()> {
    for (source_rel, dest_rel) in moves {
        let source = staging_root.join(source_rel);
        let dest = dest_root.join(dest_rel);

        if fs::metadata(&source).await.is_err() {
            return Err(PostProcessError::MissingSourcePath { path: source }.into());
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        debug!(?source, ?dest, "remapping extracted subtree");
        fs::rename(&source, &dest)
            .await
            .map_err(|e| PostProcessError::MoveFailed {
                source_path: source.clone(),
                dest_path: dest.clone(),
                reason: e.to_string(),
            })?;
    }

    for residue in residues {
        let path = staging_root.join(residue);
        if fs::metadata(&path).await.is_err() {
            continue;
        }
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };
        removed.map_err(|e| PostProcessError::CleanupFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    }

    info!(
        moves = moves.len(),
        residues = residues.len(),
        "remap complete"
    );
    Ok(())
}

/// Move every immediate child of `dir` up into its parent and remove the
/// emptied directory
///
/// Used for categories whose extractor output nests per-variant bundler
/// subfolders one level deeper than the canonical layout expects.
pub async fn flatten(dir: &Path) -> Result<()> {
    let parent = dir
        .parent()
        .ok_or_else(|| PostProcessError::InvalidPath {
            path: dir.to_path_buf(),
            reason: "no parent directory to flatten into".into(),
        })?
        .to_path_buf();

    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let from = entry.path();
        let to = parent.join(entry.file_name());
        fs::rename(&from, &to)
            .await
            .map_err(|e| PostProcessError::MoveFailed {
                source_path: from.clone(),
                dest_path: to.clone(),
                reason: e.to_string(),
            })?;
    }

    if let Err(e) = fs::remove_dir_all(dir).await {
        warn!(?dir, error = %e, "failed to remove flattened directory");
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;

    #[tokio::test]
    async fn moves_subtrees_and_deletes_residues() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("images");
        let built = staging.join("Assets/BuiltAssets/items/2x");
        stdfs::create_dir_all(&built).unwrap();
        stdfs::write(built.join("1.png"), b"i").unwrap();
        stdfs::write(staging.join("item_images.imagebundle"), b"b").unwrap();

        remap(
            &staging,
            &staging,
            &[(PathBuf::from("Assets/BuiltAssets/items/2x"), PathBuf::from("items"))],
            &[PathBuf::from("Assets"), PathBuf::from("item_images.imagebundle")],
        )
        .await
        .unwrap();

        assert!(staging.join("items/1.png").exists());
        assert!(!staging.join("Assets").exists());
        assert!(!staging.join("item_images.imagebundle").exists());
    }

    #[tokio::test]
    async fn missing_source_is_an_error_and_preserves_residues() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("images");
        stdfs::create_dir_all(&staging).unwrap();
        stdfs::write(staging.join("leftover.imagebundle"), b"b").unwrap();

        let err = remap(
            &staging,
            &staging,
            &[(PathBuf::from("Assets/BuiltAssets/gone/2x"), PathBuf::from("gone"))],
            &[PathBuf::from("leftover.imagebundle")],
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            crate::Error::PostProcess(PostProcessError::MissingSourcePath { .. })
        ));
        // Deletion must not run when a move in the batch failed.
        assert!(staging.join("leftover.imagebundle").exists());
    }

    #[tokio::test]
    async fn absent_residues_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().to_path_buf();
        remap(&staging, &staging, &[], &[PathBuf::from("never-existed")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn flatten_lifts_children_one_level() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("emblems/backcontent/2x");
        stdfs::create_dir_all(&nested).unwrap();
        stdfs::write(nested.join("a.png"), b"a").unwrap();
        stdfs::write(nested.join("b.png"), b"b").unwrap();

        flatten(&nested).await.unwrap();

        let parent = dir.path().join("emblems/backcontent");
        assert!(parent.join("a.png").exists());
        assert!(parent.join("b.png").exists());
        assert!(!nested.exists());
    }
}
