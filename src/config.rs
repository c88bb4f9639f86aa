//! Configuration types for asset-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Pipeline behavior configuration (directories, progress rendering,
/// extractor image)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root directory the canonical asset tree is built under
    /// (default: "./data")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log progress through tracing instead of rendering bars (default: false)
    #[serde(default)]
    pub headless: bool,

    /// Container image name of the external bundle extractor, without tag
    /// (default: "stelzo/assetstudio-cli")
    #[serde(default = "default_extractor_image")]
    pub extractor_image: String,

    /// Architecture qualifier used as the extractor image tag
    /// (default: the host architecture)
    #[serde(default = "default_extractor_arch")]
    pub extractor_arch: String,
}

impl PipelineConfig {
    /// Staging directory for downloaded legacy archives
    pub fn tmp_dir(&self) -> PathBuf {
        self.data_dir.join("tmp")
    }

    /// Root of the canonical image tree
    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    /// Architecture-qualified extractor image tag
    pub fn extractor_tag(&self) -> String {
        format!("{}:{}", self.extractor_image, self.extractor_arch)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            headless: false,
            extractor_image: default_extractor_image(),
            extractor_arch: default_extractor_arch(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_extractor_image() -> String {
    "stelzo/assetstudio-cli".to_string()
}

fn default_extractor_arch() -> String {
    std::env::consts::ARCH.to_string()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_derive_from_data_dir() {
        let config = PipelineConfig {
            data_dir: PathBuf::from("/srv/assets"),
            ..Default::default()
        };
        assert_eq!(config.tmp_dir(), PathBuf::from("/srv/assets/tmp"));
        assert_eq!(config.images_dir(), PathBuf::from("/srv/assets/images"));
    }

    #[test]
    fn extractor_tag_is_architecture_qualified() {
        let config = PipelineConfig {
            extractor_image: "stelzo/assetstudio-cli".into(),
            extractor_arch: "arm64".into(),
            ..Default::default()
        };
        assert_eq!(config.extractor_tag(), "stelzo/assetstudio-cli:arm64");
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.extractor_image, "stelzo/assetstudio-cli");
        assert_eq!(config.extractor_arch, std::env::consts::ARCH);
        assert!(!config.headless);
    }
}
