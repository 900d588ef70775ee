use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::record::CheckpointRecord;

/// Which field of a completed record identifies it on resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeKey {
    /// Skip records whose URL is in the success log.
    #[default]
    Url,
    /// Skip records whose expected hash is in the success log, whatever URL
    /// it was fetched from.
    ExpectedHash,
}

impl ResumeKey {
    pub fn of<'a>(self, url: &'a str, expected_hash: &'a str) -> &'a str {
        match self {
            ResumeKey::Url => url,
            ResumeKey::ExpectedHash => expected_hash,
        }
    }
}

/// Keys of items known to be durably completed. Only grows.
#[derive(Debug, Clone, Default)]
pub struct ResumeSet {
    key: ResumeKey,
    keys: HashSet<String>,
}

impl ResumeSet {
    pub fn new(key: ResumeKey) -> Self {
        Self {
            key,
            keys: HashSet::new(),
        }
    }

    pub fn key(&self) -> ResumeKey {
        self.key
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Insert the key of a record that has been durably appended.
    pub(crate) fn insert_record(&mut self, record: &CheckpointRecord) {
        let key = self.key.of(&record.url, &record.expected_hash);
        self.keys.insert(key.to_string());
    }
}
