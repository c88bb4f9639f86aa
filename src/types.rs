//! Core types for asset-dl

use serde::{Deserialize, Serialize};

/// One remotely addressable artifact and the name it takes locally
///
/// These are config-time constants declared per version per asset
/// category; the pipeline never mutates them at runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileSpec {
    /// Path of the artifact inside the remote release
    pub remote_path: String,
    /// Filename the artifact takes under the destination directory
    pub local_name: String,
}

impl RemoteFileSpec {
    /// Create a new spec from a remote path and a local filename
    pub fn new(remote_path: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            remote_path: remote_path.into(),
            local_name: local_name.into(),
        }
    }
}

/// One decoded member of a packed archive
///
/// Produced transiently by an [`crate::ArchiveDecoder`]; owned exclusively
/// by the unpack step that writes it to disk, then discarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Filename of the entry inside the archive
    pub name: String,
    /// Raw byte payload of the entry
    pub payload: Vec<u8>,
}

/// How a release version sources its assets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcingMode {
    /// Download d2p archives and unpack them locally (version 2)
    LegacyArchive,
    /// Download platform asset bundles and run the external extractor (version 3)
    Bundle,
}

/// Parameters for the size-emitting normalization variant
///
/// Categories carrying this spec ship both a full-resolution asset (renamed
/// with the qualifier suffix) and a derived square thumbnail under the bare
/// canonical name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThumbnailSpec {
    /// Exact square edge length a source image must have to survive
    pub expected: u32,
    /// Edge length of the derived square thumbnail
    pub thumb: u32,
    /// Suffix appended to the surviving full-size image (e.g. "200")
    pub qualifier: &'static str,
}

/// One named destination subtree with its source locator and
/// normalization parameters
///
/// Categories are compile-time constants; [`crate::VersionProfile`]
/// validates at startup that no two categories share or nest inside each
/// other's target path.
#[derive(Clone, Debug)]
pub struct AssetCategory {
    /// Destination subtree under the images directory (e.g. "items",
    /// "ui/arena"); also the category's display name
    pub name: &'static str,
    /// Path of the category's bundle inside the remote release
    pub remote_path: &'static str,
    /// Filename the downloaded bundle takes on disk
    pub local_name: &'static str,
    /// Directory (relative to the images directory) the bundle is
    /// downloaded into and the extractor is run from
    pub download_to: &'static str,
    /// Subtree under the extractor's `Assets/BuiltAssets/` output that
    /// must be remapped to `name`; `None` for categories the extractor
    /// deposits in place
    pub built_path: Option<&'static str>,
    /// Minimum dimension filter for normalization (0 = no size filter)
    pub min_dimension: u32,
    /// Regex excluding certain filenames from duplicate-collapsing renames
    pub exclusion: Option<&'static str>,
    /// Per-variant subdirs under the target that the extractor nests one
    /// level too deep; each is normalized and then flattened into its
    /// parent variant directory
    pub flatten: &'static [&'static str],
    /// Size-emitting normalization parameters, when the category ships
    /// both a full-size and a thumbnail asset
    pub thumbnail: Option<ThumbnailSpec>,
}

/// One legacy download-then-unpack batch (version 2)
#[derive(Clone, Debug)]
pub struct LegacyBatch {
    /// Display title used for progress reporting
    pub title: &'static str,
    /// Archives to download, in order
    pub files: Vec<RemoteFileSpec>,
    /// Staging directory (relative to the data directory) archives land in
    pub staging: &'static str,
    /// Target directory (relative to the data directory) entries unpack to
    pub target: &'static str,
}

/// Aggregate counts reported by a normalization pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Files collapsed to their canonical name
    pub renamed: usize,
    /// Files deleted by the dimension filter
    pub deleted: usize,
    /// Files considered by the pass
    pub total: usize,
}

impl std::ops::AddAssign for NormalizeStats {
    fn add_assign(&mut self, rhs: Self) {
        self.renamed += rhs.renamed;
        self.deleted += rhs.deleted;
        self.total += rhs.total;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_file_spec_new_accepts_str_and_string() {
        let spec = RemoteFileSpec::new("content/gfx/items/bitmap0.d2p", String::from("b0.d2p"));
        assert_eq!(spec.remote_path, "content/gfx/items/bitmap0.d2p");
        assert_eq!(spec.local_name, "b0.d2p");
    }

    #[test]
    fn normalize_stats_accumulate() {
        let mut total = NormalizeStats::default();
        total += NormalizeStats {
            renamed: 2,
            deleted: 1,
            total: 5,
        };
        total += NormalizeStats {
            renamed: 1,
            deleted: 0,
            total: 3,
        };
        assert_eq!(
            total,
            NormalizeStats {
                renamed: 3,
                deleted: 1,
                total: 8,
            }
        );
    }
}
