// src/fingerprint.rs
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Short hex SHA-256 prefix (12 chars). Used instead of raw text in logs and
/// for stable download file names.
pub fn short_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
