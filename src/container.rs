//! Container runtime boundary for the external bundle extractor
//!
//! Newer release versions package assets as platform bundles that only a
//! third-party extractor can open. The extractor ships as a container
//! image; this module defines the runtime seam and a docker-CLI
//! implementation of it.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Pulls images and runs the external extractor container
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Ensure the image is present locally, pulling it if absent
    async fn ensure_image(&self, image: &str) -> Result<()>;

    /// Run the image to completion with host paths mounted into the
    /// container
    ///
    /// `mounts` pairs host paths with their in-container mount points.
    /// Completion is awaited synchronously; the pipeline never overlaps
    /// extraction with later stages.
    async fn run(&self, image: &str, mounts: &[(PathBuf, PathBuf)], args: &[String])
    -> Result<()>;
}

/// CLI-based container runtime using the docker binary
///
/// # Examples
///
/// ```no_run
/// use asset_dl::container::{ContainerRuntime, DockerCli};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let runtime = DockerCli::from_path().ok_or("docker not found")?;
/// runtime.ensure_image("stelzo/assetstudio-cli:x86_64").await?;
/// # Ok(())
/// # }
/// ```
pub struct DockerCli {
    binary_path: PathBuf,
}

impl DockerCli {
    /// Create a runtime with an explicit docker binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find docker in PATH
    pub fn from_path() -> Option<Self> {
        which::which("docker").ok().map(Self::new)
    }

    async fn docker(&self, args: &[String]) -> Result<std::process::Output> {
        Command::new(&self.binary_path)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("failed to execute docker: {e}")))
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn ensure_image(&self, image: &str) -> Result<()> {
        let inspect = self
            .docker(&["image".into(), "inspect".into(), image.into()])
            .await?;
        if inspect.status.success() {
            debug!(image, "extractor image already present");
            return Ok(());
        }

        info!(image, "pulling extractor image");
        let pull = self.docker(&["pull".into(), image.into()]).await?;
        if !pull.status.success() {
            return Err(Error::ExternalTool(format!(
                "docker pull {image} failed: {}",
                String::from_utf8_lossy(&pull.stderr).trim()
            )));
        }
        Ok(())
    }

    async fn run(
        &self,
        image: &str,
        mounts: &[(PathBuf, PathBuf)],
        args: &[String],
    ) -> Result<()> {
        let mut cmd_args: Vec<String> = vec!["run".into(), "--rm".into()];
        for (host, container) in mounts {
            cmd_args.push("-v".into());
            cmd_args.push(format!("{}:{}", host.display(), container.display()));
        }
        cmd_args.push(image.into());
        cmd_args.extend(args.iter().cloned());

        debug!(image, ?args, "running extractor container");
        let output = self.docker(&cmd_args).await?;
        if !output.status.success() {
            return Err(Error::ExternalTool(format!(
                "docker run {image} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Build the in-container invocation for extracting one downloaded bundle
///
/// The host directory holding the bundle is mounted at `/data`; the
/// extractor deposits its fixed `Assets/BuiltAssets/...` subtree next to
/// the bundle file.
pub(crate) fn extractor_invocation(
    host_dir: &Path,
    bundle_name: &str,
) -> (Vec<(PathBuf, PathBuf)>, Vec<String>) {
    let mounts = vec![(host_dir.to_path_buf(), PathBuf::from("/data"))];
    let args = vec![
        format!("/data/{bundle_name}"),
        "-o".to_string(),
        "/data".to_string(),
    ];
    (mounts, args)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_returns_none_for_nonexistent_binary() {
        assert!(which::which("nonexistent-docker-binary-xyz").is_err());
    }

    #[test]
    fn extractor_invocation_mounts_host_dir_at_data() {
        let (mounts, args) = extractor_invocation(Path::new("/srv/images"), "item.imagebundle");
        assert_eq!(
            mounts,
            vec![(PathBuf::from("/srv/images"), PathBuf::from("/data"))]
        );
        assert_eq!(args[0], "/data/item.imagebundle");
        assert_eq!(args[1..], ["-o".to_string(), "/data".to_string()]);
    }
}
