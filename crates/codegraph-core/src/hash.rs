//! SHA-256 content hashing, stable across platforms (no line-ending
//! normalization — hashes raw bytes as read from disk).

use sha2::{Digest, Sha256};

/// Computes a hex-encoded SHA-256 digest over raw file bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentHasher;

impl ContentHasher {
    pub fn new() -> Self {
        Self
    }

    pub fn hash(&self, bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }
}
