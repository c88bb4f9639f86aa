//! Archive decoding boundary
//!
//! The byte-level layout of the packed d2p container is owned by the
//! decoder implementation a host wires in; the pipeline only consumes the
//! decode-to-named-blobs operation.

use crate::error::Result;
use crate::types::ArchiveEntry;

/// Decodes a packed-archive byte stream into its named member payloads
///
/// Implementations decode the whole archive eagerly; the unpacker writes
/// each returned entry to disk and then discards it. Entries whose name
/// carries the reserved pass-through extension are still returned as raw
/// bytes; the unpacker writes them verbatim rather than asking for a
/// recursive decode.
pub trait ArchiveDecoder: Send + Sync {
    /// Decode one archive into its entries
    fn decode(&self, archive: &[u8]) -> Result<Vec<ArchiveEntry>>;
}
