//! Archive unpacking with bounded progress reporting
//!
//! Walks a directory for packed archives, decodes each through the wired-in
//! [`ArchiveDecoder`], and writes every decoded entry into the output tree.
//! Acquisition errors are fatal for the whole batch, since a partial write
//! would corrupt the output tree silently, and are propagated as [`Error`]
//! values to the caller-owned boundary.

use crate::decode::ArchiveDecoder;
use crate::error::{Result, UnpackError};
use crate::progress::ProgressSink;
use crate::utils::{files_with_extension, has_extension};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// File extension marking packed archives
pub const ARCHIVE_EXT: &str = "d2p";

/// Reserved member extension that cannot be unpacked further
///
/// Entries with this extension are written verbatim with a logged warning
/// instead of being recursively decoded.
pub const PASSTHROUGH_EXT: &str = "swl";

/// Decodes every archive under an input directory into an output tree
pub struct ArchiveUnpacker {
    decoder: Arc<dyn ArchiveDecoder>,
    cancel: CancellationToken,
    headless: bool,
}

impl ArchiveUnpacker {
    /// Create an unpacker around a decoder and a cancellation token
    ///
    /// The token is shared with the progress sink; revoking it (operator
    /// cancellation) stops unpacking at the next unit boundary.
    pub fn new(decoder: Arc<dyn ArchiveDecoder>, cancel: CancellationToken, headless: bool) -> Self {
        Self {
            decoder,
            cancel,
            headless,
        }
    }

    /// Unpack every archive under `in_dir` into `out_dir`
    ///
    /// Enumerates `*.d2p` files in directory-walk order, decodes each, and
    /// writes every entry to `out_dir/{entry_name}`. One progress unit is
    /// emitted per archive, strictly after all of its entries are on disk.
    /// Input archives are never deleted; cleanup is the caller's
    /// responsibility.
    ///
    /// # Errors
    ///
    /// Returns [`UnpackError`] naming the offending file on the first
    /// read, decode, or write failure, and [`crate::Error::Cancelled`] when
    /// the operator revokes the cancellation token mid-batch.
    pub async fn unpack(&self, title: &str, in_dir: &Path, out_dir: &Path) -> Result<()> {
        let archives = files_with_extension(in_dir, ARCHIVE_EXT);
        debug!(title, ?in_dir, count = archives.len(), "enumerated archives");

        fs::create_dir_all(out_dir).await?;

        let sink = ProgressSink::bar(
            &format!("Unpack {title}"),
            archives.len(),
            self.headless,
            self.cancel.clone(),
        );

        for archive in &archives {
            let result = self.unpack_one(archive, out_dir).await;
            if let Err(e) = result {
                sink.finish().await;
                return Err(e);
            }
            // Write-before-signal: the unit is emitted only after every
            // entry of this archive is on disk.
            if let Err(e) = sink.unit() {
                sink.finish().await;
                return Err(e);
            }
        }

        sink.finish().await;
        Ok(())
    }

    async fn unpack_one(&self, archive: &Path, out_dir: &Path) -> Result<()> {
        let bytes = fs::read(archive)
            .await
            .map_err(|e| UnpackError::ArchiveRead {
                archive: archive.to_path_buf(),
                reason: e.to_string(),
            })?;

        let entries = self
            .decoder
            .decode(&bytes)
            .map_err(|e| UnpackError::Decode {
                archive: archive.to_path_buf(),
                reason: e.to_string(),
            })?;

        for entry in entries {
            if has_extension(Path::new(&entry.name), PASSTHROUGH_EXT) {
                warn!(entry = %entry.name, "can not unpack swl member, writing verbatim");
            }
            fs::write(out_dir.join(&entry.name), &entry.payload)
                .await
                .map_err(|e| UnpackError::WriteEntry {
                    entry: entry.name.clone(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }
}
