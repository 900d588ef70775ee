//! `hashfetch checksum` – SHA-256 of a local file.

use anyhow::Result;
use hashfetch_core::checksum;
use std::path::Path;

/// Prints `<digest>  <path>` like `sha256sum`.
pub fn run_checksum(path: &Path) -> Result<()> {
    let digest = checksum::sha256_path(path)?;
    println!("{}  {}", digest, path.display());
    Ok(())
}
