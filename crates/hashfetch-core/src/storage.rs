//! Content-addressed file storage.
//!
//! Files are named after the digest computed from their bytes, so a file
//! under a hash name always holds content with that hash. Writes go to a
//! uniquely named `.part` temp file in the same directory, are synced, then
//! renamed into place; concurrent writers of the same hash race harmlessly.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Output directory plus the extension appended to each digest.
#[derive(Debug, Clone)]
pub struct ContentStore {
    dir: PathBuf,
    extension: String,
}

impl ContentStore {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            dir: dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the output directory if absent.
    pub fn ensure_dir(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    /// `<dir>/<computed_hash>.<ext>`.
    pub fn path_for(&self, computed_hash: &str) -> PathBuf {
        if self.extension.is_empty() {
            self.dir.join(computed_hash)
        } else {
            self.dir
                .join(format!("{}.{}", computed_hash, self.extension))
        }
    }

    /// Store `bytes` under `computed_hash`. Returns the final path.
    ///
    /// Skips the write when a file with that name already exists; its content
    /// is identical by construction.
    pub fn write_blocking(&self, computed_hash: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let final_path = self.path_for(computed_hash);
        if final_path.exists() {
            tracing::debug!(path = %final_path.display(), "content already stored");
            return Ok(final_path);
        }
        let mut tmp = tempfile::Builder::new()
            .prefix(".hashfetch-")
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&final_path).map_err(|e| e.error)?;
        Ok(final_path)
    }

    /// Async wrapper running [`Self::write_blocking`] on the blocking pool.
    pub async fn write(&self, computed_hash: String, bytes: Vec<u8>) -> io::Result<PathBuf> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.write_blocking(&computed_hash, &bytes))
            .await
            .map_err(io::Error::other)?
    }
}
