//! Version-keyed sourcing tables
//!
//! A release version maps to exactly one [`VersionProfile`]: either the
//! legacy d2p-archive batches (version 2) or the declarative bundle
//! category table (version 3). Unknown versions are a hard error before
//! any filesystem mutation; dispatch never silently defaults to the
//! nearest known version.
//!
//! The category-to-path mappings are plain data rather than scattered
//! literals so the no-two-categories-share-a-destination invariant can be
//! checked at startup.

use crate::error::{Error, Result};
use crate::types::{AssetCategory, LegacyBatch, RemoteFileSpec, SourcingMode, ThumbnailSpec};

/// Release version sourced from legacy d2p archives
pub const LEGACY_ARCHIVE_VERSION: u32 = 2;
/// Release version sourced from platform asset bundles
pub const BUNDLE_VERSION: u32 = 3;

/// The sourcing strategy and category layout of one release version
///
/// Exactly one profile is active per pipeline run.
#[derive(Clone, Debug)]
pub struct VersionProfile {
    /// The release version this profile describes
    pub version: u32,
    /// How this version sources its assets
    pub mode: SourcingMode,
    /// Bundle categories, in processing order (empty for legacy versions)
    pub categories: Vec<AssetCategory>,
    /// Legacy download-then-unpack batches (empty for bundle versions)
    pub legacy: Vec<LegacyBatch>,
}

impl VersionProfile {
    /// Resolve the profile for a release version
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVersion`] for any version without a
    /// sourcing strategy; no partial work is attempted for those.
    pub fn for_version(version: u32) -> Result<Self> {
        match version {
            LEGACY_ARCHIVE_VERSION => Ok(Self {
                version,
                mode: SourcingMode::LegacyArchive,
                categories: Vec::new(),
                legacy: legacy_batches(),
            }),
            BUNDLE_VERSION => Ok(Self {
                version,
                mode: SourcingMode::Bundle,
                categories: bundle_categories(),
                legacy: Vec::new(),
            }),
            _ => Err(Error::UnsupportedVersion { version }),
        }
    }

    /// Check the category layout invariant
    ///
    /// Every category's target path must be unique and must not nest
    /// inside another category's target path; overlapping destinations
    /// would let two sequential writers touch the same subtree.
    pub fn validate(&self) -> Result<()> {
        for (i, a) in self.categories.iter().enumerate() {
            for b in self.categories.iter().skip(i + 1) {
                if a.name == b.name {
                    return Err(Error::Config {
                        message: format!("duplicate category target path: {}", a.name),
                        key: Some("categories".into()),
                    });
                }
                if paths_overlap(a.name, b.name) {
                    return Err(Error::Config {
                        message: format!(
                            "overlapping category target paths: {} and {}",
                            a.name, b.name
                        ),
                        key: Some("categories".into()),
                    });
                }
            }
        }
        Ok(())
    }
}

fn paths_overlap(a: &str, b: &str) -> bool {
    a.starts_with(&format!("{b}/")) || b.starts_with(&format!("{a}/"))
}

/// Version 2: item bitmaps and item vectors, downloaded as d2p archives
/// and unpacked locally. Raw unpacked files are the final output; no
/// normalization applies.
fn legacy_batches() -> Vec<LegacyBatch> {
    let bitmaps = [
        ("content/gfx/items/bitmap0.d2p", "bitmaps_0.d2p"),
        ("content/gfx/items/bitmap0_1.d2p", "bitmaps_1.d2p"),
        ("content/gfx/items/bitmap1.d2p", "bitmaps_2.d2p"),
        ("content/gfx/items/bitmap1_1.d2p", "bitmaps_3.d2p"),
        ("content/gfx/items/bitmap1_2.d2p", "bitmaps_4.d2p"),
    ];
    let vectors = [
        ("content/gfx/items/vector0.d2p", "vector_0.d2p"),
        ("content/gfx/items/vector0_1.d2p", "vector_1.d2p"),
        ("content/gfx/items/vector1.d2p", "vector_2.d2p"),
        ("content/gfx/items/vector1_1.d2p", "vector_3.d2p"),
        ("content/gfx/items/vector1_2.d2p", "vector_4.d2p"),
    ];

    vec![
        LegacyBatch {
            title: "Item Bitmaps",
            files: bitmaps
                .into_iter()
                .map(|(remote, local)| RemoteFileSpec::new(remote, local))
                .collect(),
            staging: "tmp",
            target: "images",
        },
        LegacyBatch {
            title: "Item Vectors",
            files: vectors
                .into_iter()
                .map(|(remote, local)| RemoteFileSpec::new(remote, local))
                .collect(),
            staging: "tmp/vector",
            target: "vector/item",
        },
    ]
}

/// Version 3: the full bundle category table
///
/// Categories with a `built_path` are extracted through the shared
/// `Assets/BuiltAssets/` scratch tree and remapped into place; the rest
/// are extracted in place inside their own staging directory.
fn bundle_categories() -> Vec<AssetCategory> {
    fn built(
        name: &'static str,
        remote_path: &'static str,
        local_name: &'static str,
        built_path: &'static str,
        min_dimension: u32,
    ) -> AssetCategory {
        AssetCategory {
            name,
            remote_path,
            local_name,
            download_to: "",
            built_path: Some(built_path),
            min_dimension,
            exclusion: None,
            flatten: &[],
            thumbnail: None,
        }
    }

    fn in_place(
        name: &'static str,
        remote_path: &'static str,
        local_name: &'static str,
        min_dimension: u32,
    ) -> AssetCategory {
        AssetCategory {
            name,
            remote_path,
            local_name,
            download_to: name,
            built_path: None,
            min_dimension,
            exclusion: None,
            flatten: &[],
            thumbnail: None,
        }
    }

    vec![
        built(
            "items",
            "Dofus_Data/StreamingAssets/Content/Picto/Items/item_assets_2x.bundle",
            "item_images.imagebundle",
            "items/2x",
            128,
        ),
        built(
            "monsters",
            "Dofus_Data/StreamingAssets/Content/Picto/Monsters/monster_assets_2x.bundle",
            "monster_images.imagebundle",
            "monsters/2x",
            128,
        ),
        built(
            "ui/mounts",
            "Dofus_Data/StreamingAssets/Content/Picto/UI/mount_assets_.bundle",
            "mount_images.imagebundle",
            "mounts/big",
            256,
        ),
        built(
            "ui/spells",
            "Dofus_Data/StreamingAssets/Content/Picto/Spells/spell_assets_2x.bundle",
            "spell_images.imagebundle",
            "spells/2x",
            0,
        ),
        built(
            "ui/alignments",
            "Dofus_Data/StreamingAssets/Content/Picto/UI/alignment_assets_2x.bundle",
            "alignment_images.imagebundle",
            "alignments/2x",
            0,
        ),
        built(
            "ui/challenges",
            "Dofus_Data/StreamingAssets/Content/Picto/UI/challenge_assets_2x.bundle",
            "challenges_images.imagebundle",
            "challenges/2x",
            0,
        ),
        built(
            "ui/companions",
            "Dofus_Data/StreamingAssets/Content/Picto/UI/companion_assets_2x.bundle",
            "companion_images.imagebundle",
            "companions/2x",
            168,
        ),
        built(
            "ui/cosmetics",
            "Dofus_Data/StreamingAssets/Content/Picto/UI/cosmetic_assets_2x.bundle",
            "cosmetic_images.imagebundle",
            "cosmetics/2x",
            128,
        ),
        // The emblem bundle ships per-variant subfolders one nesting level
        // deeper than the canonical layout; each is cleaned and flattened.
        AssetCategory {
            name: "ui/emblems",
            remote_path: "Dofus_Data/StreamingAssets/Content/Picto/UI/emblem_assets_2x.bundle",
            local_name: "emblem_images.imagebundle",
            download_to: "",
            built_path: Some("emblems/big"),
            min_dimension: 0,
            exclusion: None,
            flatten: &[
                "backcontent/2x",
                "outlinealliance/2x",
                "outlineguild/2x",
                "up/2x",
            ],
            thumbnail: None,
        },
        built(
            "ui/emotes",
            "Dofus_Data/StreamingAssets/Content/Picto/UI/emote_assets_2x.bundle",
            "emote_images.imagebundle",
            "emotes/2x",
            0,
        ),
        built(
            "ui/jobs",
            "Dofus_Data/StreamingAssets/Content/Picto/UI/job_assets_2x.bundle",
            "job_images.imagebundle",
            "jobs/2x",
            0,
        ),
        built(
            "ui/presets",
            "Dofus_Data/StreamingAssets/Content/Picto/UI/preset_assets_2x.bundle",
            "preset_images.imagebundle",
            "presets/2x",
            96,
        ),
        built(
            "ui/smilies",
            "Dofus_Data/StreamingAssets/Content/Picto/UI/smiley_assets_2x.bundle",
            "smiley_images.imagebundle",
            "smilies/2x",
            64,
        ),
        AssetCategory {
            exclusion: Some(r"(left|right|middle)BG"),
            ..in_place(
                "ui/arena",
                "Dofus_Data/StreamingAssets/Content/Picto/UI/arena_assets_all.bundle",
                "arena_images.imagebundle",
                0,
            )
        },
        in_place(
            "ui/achievements",
            "Dofus_Data/StreamingAssets/Content/Picto/UI/achievement_assets_all.bundle",
            "achievements_images.imagebundle",
            58,
        ),
        in_place(
            "ui/document",
            "Dofus_Data/StreamingAssets/Content/Picto/UI/document_assets_all.bundle",
            "document_images.imagebundle",
            0,
        ),
        in_place(
            "ui/guidebook",
            "Dofus_Data/StreamingAssets/Content/Picto/UI/guidebook_assets_all.bundle",
            "guidebook_images.imagebundle",
            0,
        ),
        in_place(
            "ui/guildrank",
            "Dofus_Data/StreamingAssets/Content/Picto/UI/guildrank_assets_all.bundle",
            "guildrank_images.imagebundle",
            0,
        ),
        in_place(
            "ui/house",
            "Dofus_Data/StreamingAssets/Content/Picto/UI/house_assets_all.bundle",
            "house_images.imagebundle",
            0,
        ),
        in_place(
            "ui/icon",
            "Dofus_Data/StreamingAssets/Content/Picto/UI/icon_assets_all.bundle",
            "icon_images.imagebundle",
            0,
        ),
        AssetCategory {
            exclusion: Some(r"^\d"),
            ..in_place(
                "ui/illus",
                "Dofus_Data/StreamingAssets/Content/Picto/UI/illus_assets_all.bundle",
                "illus_images.imagebundle",
                0,
            )
        },
        in_place(
            "ui/ornament",
            "Dofus_Data/StreamingAssets/Content/Picto/UI/ornament_assets_all.bundle",
            "ornament_images.imagebundle",
            0,
        ),
        in_place(
            "ui/spellstates",
            "Dofus_Data/StreamingAssets/Content/Picto/Spells/spellstate_assets_all.bundle",
            "spellstates_images.imagebundle",
            0,
        ),
        // Suggestion assets ship both a full-resolution and a derived
        // thumbnail variant from a single 200x200 source.
        AssetCategory {
            thumbnail: Some(ThumbnailSpec {
                expected: 200,
                thumb: 60,
                qualifier: "200",
            }),
            ..in_place(
                "ui/suggestion",
                "Dofus_Data/StreamingAssets/Content/Picto/UI/suggestion_assets_all.bundle",
                "suggestion_images.imagebundle",
                200,
            )
        },
    ]
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_2_is_legacy_archive_sourcing() {
        let profile = VersionProfile::for_version(2).unwrap();
        assert_eq!(profile.mode, SourcingMode::LegacyArchive);
        assert_eq!(profile.legacy.len(), 2);
        assert!(profile.categories.is_empty());

        let bitmaps = &profile.legacy[0];
        assert_eq!(bitmaps.title, "Item Bitmaps");
        assert_eq!(bitmaps.files.len(), 5);
        assert_eq!(bitmaps.target, "images");

        let vectors = &profile.legacy[1];
        assert_eq!(vectors.staging, "tmp/vector");
        assert_eq!(vectors.target, "vector/item");
    }

    #[test]
    fn version_3_is_bundle_sourcing() {
        let profile = VersionProfile::for_version(3).unwrap();
        assert_eq!(profile.mode, SourcingMode::Bundle);
        assert!(profile.legacy.is_empty());
        assert_eq!(profile.categories.len(), 24);
    }

    #[test]
    fn unknown_versions_are_a_hard_error() {
        for version in [0, 1, 4, 99] {
            let err = VersionProfile::for_version(version).unwrap_err();
            assert!(matches!(err, Error::UnsupportedVersion { version: v } if v == version));
        }
    }

    #[test]
    fn bundle_table_passes_the_overlap_invariant() {
        let profile = VersionProfile::for_version(3).unwrap();
        profile.validate().unwrap();
    }

    #[test]
    fn duplicate_target_paths_are_rejected() {
        let mut profile = VersionProfile::for_version(3).unwrap();
        let mut dup = profile.categories[0].clone();
        dup.local_name = "other.imagebundle";
        profile.categories.push(dup);

        let err = profile.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate category target path"));
    }

    #[test]
    fn nested_target_paths_are_rejected() {
        let mut profile = VersionProfile::for_version(3).unwrap();
        let mut nested = profile.categories[0].clone();
        nested.name = "items/2x";
        profile.categories.push(nested);

        let err = profile.validate().unwrap_err();
        assert!(err.to_string().contains("overlapping category target paths"));
    }

    #[test]
    fn dimension_filters_match_the_category_table() {
        let profile = VersionProfile::for_version(3).unwrap();
        let min = |name: &str| {
            profile
                .categories
                .iter()
                .find(|c| c.name == name)
                .unwrap()
                .min_dimension
        };
        assert_eq!(min("items"), 128);
        assert_eq!(min("monsters"), 128);
        assert_eq!(min("ui/mounts"), 256);
        assert_eq!(min("ui/companions"), 168);
        assert_eq!(min("ui/presets"), 96);
        assert_eq!(min("ui/smilies"), 64);
        assert_eq!(min("ui/achievements"), 58);
        assert_eq!(min("ui/spells"), 0);
    }

    #[test]
    fn suggestion_carries_the_thumbnail_spec() {
        let profile = VersionProfile::for_version(3).unwrap();
        let suggestion = profile
            .categories
            .iter()
            .find(|c| c.name == "ui/suggestion")
            .unwrap();
        assert_eq!(
            suggestion.thumbnail,
            Some(ThumbnailSpec {
                expected: 200,
                thumb: 60,
                qualifier: "200",
            })
        );
    }

    #[test]
    fn emblems_list_their_nested_variant_dirs() {
        let profile = VersionProfile::for_version(3).unwrap();
        let emblems = profile
            .categories
            .iter()
            .find(|c| c.name == "ui/emblems")
            .unwrap();
        assert_eq!(emblems.flatten.len(), 4);
        assert!(emblems.flatten.contains(&"backcontent/2x"));
    }

    #[test]
    fn exclusion_patterns_compile() {
        let profile = VersionProfile::for_version(3).unwrap();
        for category in &profile.categories {
            if let Some(pattern) = category.exclusion {
                regex::Regex::new(pattern).unwrap();
            }
        }
    }
}
