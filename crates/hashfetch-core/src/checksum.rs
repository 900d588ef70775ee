//! SHA-256 verification of downloaded content.
//!
//! Verification is a pure function over the full byte buffer; the file
//! variant is only used by the `checksum` command.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Result of checking downloaded bytes against an expected digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Lowercase hex SHA-256 of the bytes.
    pub computed_hash: String,
    /// True when `computed_hash` equals the expected value exactly.
    pub matched: bool,
}

/// SHA-256 of `bytes` as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Hash `bytes` and compare case-sensitively to `expected_hash`.
pub fn verify(bytes: &[u8], expected_hash: &str) -> Verification {
    let computed_hash = sha256_hex(bytes);
    let matched = computed_hash == expected_hash;
    Verification {
        computed_hash,
        matched,
    }
}

/// Compute SHA-256 of a file and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded; suitable for large files.
pub fn sha256_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
