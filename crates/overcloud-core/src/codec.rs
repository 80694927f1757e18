//! Gzip codec for stored payloads
//!
//! Applied by `DualStore::write` before bytes reach any backend and by
//! `DualStore::read` after they come back. The consistency policy never
//! looks inside payloads.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::domain::{RelativePath, StoreError};

/// Suffixes that already mark a path as gzip-compressed.
pub const COMPRESSED_SUFFIXES: &[&str] = &[".gz", ".tgz"];

/// Suffix appended to compressed paths that carry none of the above.
pub const DEFAULT_SUFFIX: &str = ".gz";

/// First two bytes of every gzip member.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Gzip-compresses `data` at the default level
pub fn compress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| StoreError::Codec(format!("gzip compression failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| StoreError::Codec(format!("gzip compression failed: {e}")))
}

/// Decompresses a gzip payload
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| StoreError::Codec(format!("gzip decompression failed: {e}")))?;
    Ok(out)
}

/// Returns true if `data` starts with the gzip magic bytes
#[must_use]
pub fn looks_compressed(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Returns `path` unchanged if it carries a compressed suffix, else with `.gz` appended
#[must_use]
pub fn compressed_path(path: &RelativePath) -> RelativePath {
    if COMPRESSED_SUFFIXES.iter().any(|suffix| path.has_suffix(suffix)) {
        path.clone()
    } else {
        path.with_suffix(DEFAULT_SUFFIX)
    }
}
