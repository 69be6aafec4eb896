//! Shared SHA-256 hex digest utilities.
//!
//! Used for manifest digests and rendered artifact checksums.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Compute one SHA-256 hex digest over several byte slices, each prefixed
/// with its length so that `["ab", "c"]` and `["a", "bc"]` differ.
pub fn sha256_hex_parts(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    format!("{:x}", hasher.finalize())
}
