//! Line formats for the checkpoint sinks.
//!
//! Success log: `<url>:::::<expected_hash>:<computed_hash>\n`. The URL is
//! split off at the last `:::::` so URLs with ports or colons in queries
//! survive; hashes are hex and never contain `:`.

/// Separator between the URL and the hash pair in the success log.
pub const FIELD_SEPARATOR: &str = ":::::";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("field contains a line break")]
    LineBreak,
    #[error("missing `:::::` separator")]
    MissingSeparator,
    #[error("missing `:` between expected and computed hash")]
    MissingHashSeparator,
    #[error("empty {0}")]
    EmptyField(&'static str),
}

/// One completed item in the success log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRecord {
    pub url: String,
    pub expected_hash: String,
    pub computed_hash: String,
}

impl CheckpointRecord {
    /// Encode as one newline-terminated line.
    pub fn encode(&self) -> Result<String, RecordError> {
        for field in [&self.url, &self.expected_hash, &self.computed_hash] {
            if field.contains(['\n', '\r']) {
                return Err(RecordError::LineBreak);
            }
        }
        if self.expected_hash.contains(':') || self.computed_hash.contains(':') {
            return Err(RecordError::MissingHashSeparator);
        }
        Ok(format!(
            "{}{}{}:{}\n",
            self.url, FIELD_SEPARATOR, self.expected_hash, self.computed_hash
        ))
    }

    /// Decode one line; a trailing `\n` (and `\r`) is tolerated.
    pub fn decode(line: &str) -> Result<Self, RecordError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let (url, hashes) = line
            .rsplit_once(FIELD_SEPARATOR)
            .ok_or(RecordError::MissingSeparator)?;
        let (expected_hash, computed_hash) = hashes
            .split_once(':')
            .ok_or(RecordError::MissingHashSeparator)?;
        if url.is_empty() {
            return Err(RecordError::EmptyField("url"));
        }
        if expected_hash.is_empty() {
            return Err(RecordError::EmptyField("expected hash"));
        }
        if computed_hash.is_empty() {
            return Err(RecordError::EmptyField("computed hash"));
        }
        Ok(Self {
            url: url.to_string(),
            expected_hash: expected_hash.to_string(),
            computed_hash: computed_hash.to_string(),
        })
    }
}

/// A terminal failure destined for one of the two failure sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureRecord {
    /// Goes to the hash-mismatch log.
    Mismatch {
        url: String,
        expected_hash: String,
        computed_hash: String,
    },
    /// Goes to the failed-URL log.
    Unreachable { url: String },
}

impl FailureRecord {
    pub fn url(&self) -> &str {
        match self {
            FailureRecord::Mismatch { url, .. } | FailureRecord::Unreachable { url } => url,
        }
    }

    pub fn encode(&self) -> Result<String, RecordError> {
        if self.url().contains(['\n', '\r']) {
            return Err(RecordError::LineBreak);
        }
        Ok(match self {
            FailureRecord::Mismatch {
                url,
                expected_hash,
                computed_hash,
            } => format!(
                "URL: {}, Expected hash: {}, Computed hash: {}\n",
                url, expected_hash, computed_hash
            ),
            FailureRecord::Unreachable { url } => format!("{}\n", url),
        })
    }
}
