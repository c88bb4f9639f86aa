//! Pipeline orchestration
//!
//! Ties the sourcing tables to the collaborator seams: resolve the
//! version profile, fetch the remote artifacts, unpack or extract them,
//! remap the staging tree, and normalize the result into the canonical
//! asset layout.
//!
//! All file I/O runs sequentially on the caller's task, batch by batch;
//! only progress rendering is concurrent. No two stages write the same
//! subtree, which the profile's startup validation guarantees.

use crate::config::PipelineConfig;
use crate::container::{ContainerRuntime, extractor_invocation};
use crate::decode::ArchiveDecoder;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::normalize::{normalize, normalize_sized};
use crate::progress::ProgressSink;
use crate::remap::{flatten, remap};
use crate::source::VersionProfile;
use crate::types::{AssetCategory, NormalizeStats, RemoteFileSpec, SourcingMode};
use crate::unpack::ArchiveUnpacker;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Asset acquisition-and-normalization pipeline
///
/// Construct one per run with the collaborators wired in, then call
/// [`ImagePipeline::run`] with the release version.
pub struct ImagePipeline {
    config: PipelineConfig,
    fetcher: Arc<dyn Fetcher>,
    decoder: Arc<dyn ArchiveDecoder>,
    runtime: Arc<dyn ContainerRuntime>,
    cancel: CancellationToken,
}

impl ImagePipeline {
    /// Create a pipeline around the wired-in collaborators
    pub fn new(
        config: PipelineConfig,
        fetcher: Arc<dyn Fetcher>,
        decoder: Arc<dyn ArchiveDecoder>,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Self {
        Self {
            config,
            fetcher,
            decoder,
            runtime,
            cancel: CancellationToken::new(),
        }
    }

    /// Token a host can cancel to abort the run
    ///
    /// Hosts typically wire this to a ctrl-c handler. Producers observe
    /// the revocation at their next unit boundary and return
    /// [`Error::Cancelled`].
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the pipeline for one release version
    ///
    /// Resolves and validates the version profile before any filesystem
    /// mutation; an unknown version fails with zero writes.
    pub async fn run(&self, version: u32) -> Result<()> {
        let profile = VersionProfile::for_version(version)?;
        profile.validate()?;
        info!(version, mode = ?profile.mode, "starting image pipeline");

        match profile.mode {
            SourcingMode::LegacyArchive => self.run_legacy(&profile).await,
            SourcingMode::Bundle => self.run_bundle(&profile).await,
        }
    }

    /// Version 2: download d2p archives and unpack them locally
    ///
    /// Raw unpacked files are the final output in this mode; no
    /// normalization applies. Staging archives are left in place for the
    /// caller to clean up.
    async fn run_legacy(&self, profile: &VersionProfile) -> Result<()> {
        let unpacker = ArchiveUnpacker::new(
            self.decoder.clone(),
            self.cancel.clone(),
            self.config.headless,
        );

        for batch in &profile.legacy {
            let staging = self.config.data_dir.join(batch.staging);
            let target = self.config.data_dir.join(batch.target);

            self.fetcher
                .download(batch.title, &batch.files, &staging, false)
                .await?;
            unpacker.unpack(batch.title, &staging, &target).await?;
        }
        Ok(())
    }

    /// Version 3: download bundles, run the external extractor, remap and
    /// normalize
    async fn run_bundle(&self, profile: &VersionProfile) -> Result<()> {
        let image = self.config.extractor_tag();
        self.runtime.ensure_image(&image).await?;

        let images_dir = self.config.images_dir();

        // Bundles without their own staging dir download as one batch
        // into the images root; the rest get a per-category download.
        let main_batch: Vec<RemoteFileSpec> = profile
            .categories
            .iter()
            .filter(|c| c.download_to.is_empty())
            .map(|c| RemoteFileSpec::new(c.remote_path, c.local_name))
            .collect();
        self.fetcher
            .download("Downloading assets", &main_batch, &images_dir, true)
            .await?;

        for category in profile.categories.iter().filter(|c| !c.download_to.is_empty()) {
            let spec = RemoteFileSpec::new(category.remote_path, category.local_name);
            self.fetcher
                .download(
                    &format!("Downloading {}", category.name),
                    std::slice::from_ref(&spec),
                    &images_dir.join(category.download_to),
                    true,
                )
                .await?;
        }

        // The extractor is awaited to completion per bundle; remapping
        // never overlaps extraction.
        for category in &profile.categories {
            let host_dir = images_dir.join(category.download_to);
            let (mounts, args) = extractor_invocation(&host_dir, category.local_name);
            self.runtime.run(&image, &mounts, &args).await?;
        }

        let sink = ProgressSink::spinner("Images", self.config.headless, self.cancel.clone());
        sink.stage("remapping");

        let result = self.remap_and_clean(profile, &images_dir, &sink).await;
        sink.finish().await;
        result
    }

    async fn remap_and_clean(
        &self,
        profile: &VersionProfile,
        images_dir: &Path,
        sink: &ProgressSink,
    ) -> Result<()> {
        let moves: Vec<(PathBuf, PathBuf)> = profile
            .categories
            .iter()
            .filter_map(|c| {
                c.built_path.map(|built| {
                    (
                        Path::new("Assets/BuiltAssets").join(built),
                        PathBuf::from(c.name),
                    )
                })
            })
            .collect();
        let mut residues = vec![PathBuf::from("Assets")];
        residues.extend(
            profile
                .categories
                .iter()
                .map(|c| Path::new(c.download_to).join(c.local_name)),
        );
        remap(images_dir, images_dir, &moves, &residues).await?;

        sink.stage("cleaning");
        for category in &profile.categories {
            if sink.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let stats = self.clean_category(category, images_dir).await?;
            info!(
                category = category.name,
                renamed = stats.renamed,
                deleted = stats.deleted,
                total = stats.total,
                "category normalized"
            );
        }
        Ok(())
    }

    /// Normalize one category's target subtree
    ///
    /// Image decoding is blocking work, so the pass runs under
    /// `spawn_blocking`; the pipeline still processes categories one at a
    /// time.
    async fn clean_category(
        &self,
        category: &AssetCategory,
        images_dir: &Path,
    ) -> Result<NormalizeStats> {
        let target = images_dir.join(category.name);
        let exclusion = category
            .exclusion
            .map(Regex::new)
            .transpose()
            .map_err(|e| Error::Config {
                message: format!("invalid exclusion pattern for {}: {e}", category.name),
                key: Some("exclusion".into()),
            })?;

        if let Some(spec) = category.thumbnail {
            let dir = target.clone();
            return run_blocking(move || normalize_sized(&dir, &spec)).await;
        }

        if category.flatten.is_empty() {
            let min = category.min_dimension;
            return run_blocking(move || normalize(&target, min, exclusion.as_ref())).await;
        }

        // Per-variant subdirs are normalized in place, then lifted one
        // level up into the category root.
        let mut stats = NormalizeStats::default();
        for sub in category.flatten {
            let dir = target.join(sub);
            let min = category.min_dimension;
            let pattern = exclusion.clone();
            stats += run_blocking(move || normalize(&dir, min, pattern.as_ref())).await?;
            flatten(&target.join(sub)).await?;
        }
        Ok(stats)
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    spawn_blocking(f)
        .await
        .map_err(|e| Error::Other(format!("normalization task panicked: {e}")))?
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArchiveEntry;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullFetcher {
        manifest_flags: Mutex<Vec<bool>>,
    }

    impl NullFetcher {
        fn new() -> Self {
            Self {
                manifest_flags: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Fetcher for NullFetcher {
        async fn download(
            &self,
            _title: &str,
            files: &[RemoteFileSpec],
            dest_dir: &Path,
            use_manifest_hash: bool,
        ) -> Result<()> {
            self.manifest_flags.lock().unwrap().push(use_manifest_hash);
            tokio::fs::create_dir_all(dest_dir).await?;
            for spec in files {
                tokio::fs::write(dest_dir.join(&spec.local_name), b"archive").await?;
            }
            Ok(())
        }
    }

    struct NullDecoder;

    impl ArchiveDecoder for NullDecoder {
        fn decode(&self, _archive: &[u8]) -> Result<Vec<ArchiveEntry>> {
            Ok(vec![ArchiveEntry {
                name: "entry.png".into(),
                payload: vec![1],
            }])
        }
    }

    #[derive(Default)]
    struct CountingRuntime {
        calls: AtomicUsize,
        images: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ContainerRuntime for CountingRuntime {
        async fn ensure_image(&self, image: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.images.lock().unwrap().push(image.to_string());
            Ok(())
        }

        async fn run(
            &self,
            _image: &str,
            _mounts: &[(PathBuf, PathBuf)],
            _args: &[String],
        ) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn pipeline(data_dir: &Path, runtime: Arc<CountingRuntime>) -> ImagePipeline {
        pipeline_with_fetcher(data_dir, Arc::new(NullFetcher::new()), runtime)
    }

    fn pipeline_with_fetcher(
        data_dir: &Path,
        fetcher: Arc<NullFetcher>,
        runtime: Arc<CountingRuntime>,
    ) -> ImagePipeline {
        let config = PipelineConfig {
            data_dir: data_dir.to_path_buf(),
            headless: true,
            ..Default::default()
        };
        ImagePipeline::new(config, fetcher, Arc::new(NullDecoder), runtime)
    }

    #[tokio::test]
    async fn unknown_version_fails_with_zero_filesystem_writes() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let runtime = Arc::new(CountingRuntime::default());

        let err = pipeline(&data_dir, runtime.clone()).run(4).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { version: 4 }));
        assert!(!data_dir.exists());
        assert_eq!(runtime.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn legacy_version_never_invokes_the_container_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let runtime = Arc::new(CountingRuntime::default());

        pipeline(&data_dir, runtime.clone()).run(2).await.unwrap();

        assert_eq!(runtime.calls.load(Ordering::SeqCst), 0);
        // Both legacy batches unpacked their entries into their targets.
        assert!(data_dir.join("images/entry.png").exists());
        assert!(data_dir.join("vector/item/entry.png").exists());
        // Staging archives are left in place for the caller.
        assert!(data_dir.join("tmp/bitmaps_0.d2p").exists());
        assert!(data_dir.join("tmp/vector/vector_4.d2p").exists());
    }

    #[tokio::test]
    async fn bundle_version_pulls_the_architecture_qualified_image() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let runtime = Arc::new(CountingRuntime::default());

        // The fake extractor deposits nothing, so the remap fails on the
        // first missing source path; the image pull must already have
        // happened by then.
        let result = pipeline(&data_dir, runtime.clone()).run(3).await;
        assert!(result.is_err());
        assert!(runtime.calls.load(Ordering::SeqCst) >= 1);

        let images = runtime.images.lock().unwrap();
        let expected = format!("stelzo/assetstudio-cli:{}", std::env::consts::ARCH);
        assert_eq!(images.as_slice(), [expected]);
    }

    #[tokio::test]
    async fn legacy_downloads_bypass_the_manifest_hash() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(NullFetcher::new());
        let runtime = Arc::new(CountingRuntime::default());

        pipeline_with_fetcher(&dir.path().join("data"), fetcher.clone(), runtime)
            .run(2)
            .await
            .unwrap();

        let flags = fetcher.manifest_flags.lock().unwrap();
        assert_eq!(flags.as_slice(), [false, false]);
    }

    #[tokio::test]
    async fn bundle_downloads_resolve_through_the_manifest_hash() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(NullFetcher::new());
        let runtime = Arc::new(CountingRuntime::default());

        // The fake extractor deposits nothing, so the run fails at remap;
        // every download has already happened by then.
        let _ = pipeline_with_fetcher(&dir.path().join("data"), fetcher.clone(), runtime)
            .run(3)
            .await;

        let flags = fetcher.manifest_flags.lock().unwrap();
        assert!(!flags.is_empty());
        assert!(flags.iter().all(|&used| used));
    }
}
