//! Manifest records and a reader for manifest files.
//!
//! The scheduler takes any `IntoIterator<Item = ManifestRecord>`; this module
//! only covers the common case of a dataset exported to JSON (an array) or
//! JSON Lines (one object per line).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One (URL, expected SHA-256) pair from the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    #[serde(rename = "image_url", alias = "url")]
    pub url: String,
    /// Lowercase hex SHA-256.
    #[serde(rename = "image_sha256", alias = "expected_hash")]
    pub expected_hash: String,
}

impl ManifestRecord {
    pub fn new(url: impl Into<String>, expected_hash: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expected_hash: expected_hash.into(),
        }
    }
}

/// Read a manifest file. A leading `[` selects JSON array format, anything
/// else is parsed as JSON Lines (blank lines ignored). Extra fields are ignored.
pub fn load_path(path: &Path) -> Result<Vec<ManifestRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read manifest {}", path.display()))?;
    parse(&text).with_context(|| format!("parse manifest {}", path.display()))
}

pub fn parse(text: &str) -> Result<Vec<ManifestRecord>> {
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(text).context("JSON array");
    }
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).with_context(|| format!("line {}", idx + 1))
        })
        .collect()
}
