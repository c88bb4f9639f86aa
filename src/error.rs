//! Error types for asset-dl
//!
//! This module provides the error taxonomy for the pipeline:
//! - Fatal acquisition errors (archive read/decode/write failures)
//! - Post-processing errors (remap, cleanup)
//! - Configuration errors (unknown versions, overlapping category paths)
//! - Operator cancellation
//!
//! All fatal conditions are surfaced as [`Error`] values and propagated to
//! the caller-owned top boundary; pipeline code never terminates the
//! process itself.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for asset-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for asset-dl
///
/// This is the primary error type used throughout the library. Each variant
/// includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "data_dir")
        key: Option<String>,
    },

    /// Unknown release version number (no silent fallback exists)
    #[error("unsupported version: {version}")]
    UnsupportedVersion {
        /// The version number that has no sourcing strategy
        version: u32,
    },

    /// Archive unpacking error
    #[error("unpack error: {0}")]
    Unpack(#[from] UnpackError),

    /// Post-processing error (remap, flatten, cleanup)
    #[error("post-processing error: {0}")]
    PostProcess(#[from] PostProcessError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// External tool execution failed (container runtime, extractor)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operator cancelled the run through the cancellation token
    #[error("cancelled by operator")]
    Cancelled,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Archive unpacking errors
///
/// These are fatal for the whole batch: a partial write would corrupt the
/// output tree silently, so the first failure aborts unpacking and names
/// the offending file.
#[derive(Debug, Error)]
pub enum UnpackError {
    /// Failed to read an archive file from disk
    #[error("failed to read archive {archive}: {reason}")]
    ArchiveRead {
        /// The archive file that could not be read
        archive: PathBuf,
        /// The reason the read failed
        reason: String,
    },

    /// Failed to decode an archive into entries
    #[error("failed to decode archive {archive}: {reason}")]
    Decode {
        /// The archive file that could not be decoded
        archive: PathBuf,
        /// The reason decoding failed
        reason: String,
    },

    /// Failed to write a decoded entry to the output tree
    #[error("failed to write entry {entry}: {reason}")]
    WriteEntry {
        /// The entry name that could not be written
        entry: String,
        /// The reason the write failed
        reason: String,
    },
}

/// Post-processing errors (remap, flatten, cleanup)
#[derive(Debug, Error)]
pub enum PostProcessError {
    /// An expected extractor output path is missing
    ///
    /// The extractor's output layout is assumed stable; a missing path
    /// signals that its output format changed and must surface as an
    /// error, never be skipped.
    #[error("expected source path missing: {path}")]
    MissingSourcePath {
        /// The path that was expected to exist
        path: PathBuf,
    },

    /// File move/rename failed
    #[error("failed to move {source_path} to {dest_path}: {reason}")]
    MoveFailed {
        /// The source path of the file being moved
        source_path: PathBuf,
        /// The destination path where the file should be moved
        dest_path: PathBuf,
        /// The reason the move failed
        reason: String,
    },

    /// Cleanup of a residual staging path failed
    #[error("cleanup failed for {path}: {reason}")]
    CleanupFailed {
        /// The residual path that could not be removed
        path: PathBuf,
        /// The reason cleanup failed
        reason: String,
    },

    /// Invalid path encountered during post-processing
    #[error("invalid path {path}: {reason}")]
    InvalidPath {
        /// The invalid path that was encountered
        path: PathBuf,
        /// The reason the path is invalid
        reason: String,
    },
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_version_names_the_version() {
        let err = Error::UnsupportedVersion { version: 7 };
        assert_eq!(err.to_string(), "unsupported version: 7");
    }

    #[test]
    fn unpack_error_names_the_offending_archive() {
        let err = Error::Unpack(UnpackError::Decode {
            archive: PathBuf::from("/tmp/bitmaps_0.d2p"),
            reason: "truncated index".into(),
        });
        let msg = err.to_string();
        assert!(msg.contains("bitmaps_0.d2p"));
        assert!(msg.contains("truncated index"));
    }

    #[test]
    fn missing_source_path_surfaces_the_path() {
        let err = Error::PostProcess(PostProcessError::MissingSourcePath {
            path: PathBuf::from("Assets/BuiltAssets/items/2x"),
        });
        assert!(err.to_string().contains("Assets/BuiltAssets/items/2x"));
    }

    #[test]
    fn io_error_converts_via_from() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn cancelled_has_stable_message() {
        assert_eq!(Error::Cancelled.to_string(), "cancelled by operator");
    }
}
