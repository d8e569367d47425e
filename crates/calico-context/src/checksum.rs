//! SHA-256 checksum utilities
//!
//! Single canonical checksum format (`sha256:<hex>`) used for credential
//! comparison and rendered-file change detection.

use sha2::{Digest, Sha256};
use std::path::Path;

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Placeholder used in place of a checksum for a file that does not exist,
/// so chained comparisons always have something to compare against
pub const MISSING: &str = "?";

/// Compute the SHA-256 checksum of in-memory content.
pub fn content_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Compute the SHA-256 checksum of a file's contents, or [`MISSING`] when
/// the file cannot be read.
pub fn file_checksum_or_missing(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(content) => {
            let mut hasher = Sha256::new();
            hasher.update(&content);
            format!("{}{:x}", PREFIX, hasher.finalize())
        }
        Err(_) => MISSING.to_string(),
    }
}
