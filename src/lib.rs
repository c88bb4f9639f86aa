//! # asset-dl
//!
//! Backend library for turning a versioned, remotely-hosted game-data
//! release into a canonical local tree of usable image assets.
//!
//! Source data arrives in one of two container formats depending on the
//! release version: a proprietary packed-archive format ("d2p") in older
//! releases, and platform asset bundles in newer ones (the latter unpacked
//! by an external containerized extractor). This crate owns the pipeline
//! around those containers: concurrent-progress archive unpacking, the
//! version-keyed sourcing strategy, staging-tree remapping, and the image
//! normalization pass that deduplicates, size-filters, and thumbnails the
//! extracted files.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Seams for collaborators** - Downloading, d2p decoding, and the
//!   bundle extractor sit behind traits ([`Fetcher`], [`ArchiveDecoder`],
//!   [`ContainerRuntime`]) so hosts can swap implementations
//! - **Errors, not exits** - Every fatal condition is a [`Error`] value
//!   propagated to the caller; the pipeline never terminates the process
//! - **Declarative version tables** - Category-to-path mappings are plain
//!   data validated at startup, not scattered literals
//!
//! ## Quick Start
//!
//! ```no_run
//! use asset_dl::{DockerCli, HttpFetcher, ImagePipeline, PipelineConfig};
//! use std::sync::Arc;
//!
//! # struct MyDecoder;
//! # impl asset_dl::ArchiveDecoder for MyDecoder {
//! #     fn decode(&self, _: &[u8]) -> asset_dl::Result<Vec<asset_dl::ArchiveEntry>> {
//! #         Ok(vec![])
//! #     }
//! # }
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default();
//!     let fetcher = HttpFetcher::new("https://cdn.example.com/".parse()?);
//!     let runtime = DockerCli::from_path().ok_or("docker not found")?;
//!
//!     let pipeline = ImagePipeline::new(
//!         config,
//!         Arc::new(fetcher),
//!         Arc::new(MyDecoder),
//!         Arc::new(runtime),
//!     );
//!     pipeline.run(3).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Container runtime boundary for the external bundle extractor
pub mod container;
/// Archive decoding boundary
pub mod decode;
/// Error types
pub mod error;
/// Remote file fetching boundary
pub mod fetch;
/// Image normalization pass
pub mod normalize;
/// Pipeline orchestration
pub mod pipeline;
/// Progress reporting
pub mod progress;
/// Staging-tree remapping
pub mod remap;
/// Version-keyed sourcing tables
pub mod source;
/// Core types
pub mod types;
/// Archive unpacking
pub mod unpack;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use container::{ContainerRuntime, DockerCli};
pub use decode::ArchiveDecoder;
pub use error::{Error, PostProcessError, Result, UnpackError};
pub use fetch::{Fetcher, HttpFetcher};
pub use normalize::{normalize, normalize_sized};
pub use pipeline::ImagePipeline;
pub use progress::{ProgressEvent, ProgressSink};
pub use remap::{flatten, remap};
pub use source::VersionProfile;
pub use types::{
    ArchiveEntry, AssetCategory, LegacyBatch, NormalizeStats, RemoteFileSpec, SourcingMode,
    ThumbnailSpec,
};
pub use unpack::ArchiveUnpacker;
