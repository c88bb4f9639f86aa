//! Remote file fetching boundary
//!
//! The manifest/hash-diff mechanism that decides *which* remote files need
//! fetching lives outside this crate; the pipeline only requires that
//! fetched files land under the destination directory named per
//! [`RemoteFileSpec::local_name`]. [`HttpFetcher`] is the built-in
//! implementation for plain HTTP-hosted releases.

use crate::error::Result;
use crate::progress::ProgressSink;
use crate::types::RemoteFileSpec;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Downloads a batch of remote files into a destination directory
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download every spec in order; each file lands at
    /// `dest_dir/{local_name}`
    ///
    /// `use_manifest_hash` tells manifest-aware implementations to resolve
    /// each remote path through the release manifest's content hashes
    /// instead of fetching the literal path. Plain fetchers may ignore it.
    async fn download(
        &self,
        title: &str,
        files: &[RemoteFileSpec],
        dest_dir: &Path,
        use_manifest_hash: bool,
    ) -> Result<()>;
}

/// HTTP fetcher resolving remote paths against a base URL
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: Url,
    cancel: CancellationToken,
    headless: bool,
}

impl HttpFetcher {
    /// Create a fetcher for a release hosted under `base_url`
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            cancel: CancellationToken::new(),
            headless: false,
        }
    }

    /// Share an operator cancellation token with the fetcher
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Log progress through tracing instead of rendering a bar
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn download(
        &self,
        title: &str,
        files: &[RemoteFileSpec],
        dest_dir: &Path,
        use_manifest_hash: bool,
    ) -> Result<()> {
        if use_manifest_hash {
            debug!(title, "no manifest available, fetching literal paths");
        }
        fs::create_dir_all(dest_dir).await?;
        let sink = ProgressSink::bar(title, files.len(), self.headless, self.cancel.clone());

        for spec in files {
            let result = self.download_one(spec, dest_dir).await;
            if let Err(e) = result {
                sink.finish().await;
                return Err(e);
            }
            if let Err(e) = sink.unit() {
                sink.finish().await;
                return Err(e);
            }
        }

        sink.finish().await;
        Ok(())
    }
}

impl HttpFetcher {
    async fn download_one(&self, spec: &RemoteFileSpec, dest_dir: &Path) -> Result<()> {
        let url = self
            .base_url
            .join(&spec.remote_path)
            .map_err(|e| crate::Error::Config {
                message: format!("invalid remote path {}: {e}", spec.remote_path),
                key: Some("remote_path".into()),
            })?;
        debug!(%url, local = %spec.local_name, "fetching remote file");

        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        fs::write(dest_dir.join(&spec.local_name), &bytes).await?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn files_land_under_their_local_names() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/content/gfx/items/bitmap0.d2p"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = HttpFetcher::new(server.uri().parse().unwrap()).headless(true);
        let specs = vec![RemoteFileSpec::new(
            "content/gfx/items/bitmap0.d2p",
            "bitmaps_0.d2p",
        )];
        fetcher
            .download("Item Bitmaps", &specs, dir.path(), false)
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("bitmaps_0.d2p")).unwrap();
        assert_eq!(written, b"payload");
    }

    #[tokio::test]
    async fn http_error_status_fails_the_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = HttpFetcher::new(server.uri().parse().unwrap()).headless(true);
        let specs = vec![RemoteFileSpec::new("missing.d2p", "missing.d2p")];
        let err = fetcher.download("Missing", &specs, dir.path(), false).await;
        assert!(err.is_err());
        assert!(!dir.path().join("missing.d2p").exists());
    }

    #[tokio::test]
    async fn pre_cancelled_token_stops_after_first_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let dir = tempfile::tempdir().unwrap();
        let fetcher = HttpFetcher::new(server.uri().parse().unwrap())
            .headless(true)
            .with_cancel(cancel);
        let specs = vec![
            RemoteFileSpec::new("a.bundle", "a.bundle"),
            RemoteFileSpec::new("b.bundle", "b.bundle"),
        ];

        let err = fetcher.download("Bundles", &specs, dir.path(), true).await;
        assert!(matches!(err, Err(crate::Error::Cancelled)));
        assert!(!dir.path().join("b.bundle").exists());
    }
}
