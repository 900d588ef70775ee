//! Tagged result of processing one manifest record.

/// Outcome of one task (or of one failed attempt, for `TransientFailure`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Content verified, stored and checkpointed.
    Success {
        url: String,
        expected_hash: String,
        computed_hash: String,
    },
    /// Downloaded bytes did not hash to the expected value on the final attempt.
    HashMismatch {
        url: String,
        expected_hash: String,
        computed_hash: String,
    },
    /// An attempt failed and will be retried. Never terminal.
    TransientFailure { url: String, error: String },
    /// Retry budget exhausted or a fatal local fault.
    PermanentFailure { url: String, error: String },
    /// Already present in the resume set; nothing was fetched.
    Skipped { url: String },
}

impl Outcome {
    pub fn url(&self) -> &str {
        match self {
            Outcome::Success { url, .. }
            | Outcome::HashMismatch { url, .. }
            | Outcome::TransientFailure { url, .. }
            | Outcome::PermanentFailure { url, .. }
            | Outcome::Skipped { url } => url,
        }
    }

    /// True for every variant except `TransientFailure`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::TransientFailure { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::HashMismatch { .. } => "hash_mismatch",
            Outcome::TransientFailure { .. } => "transient_failure",
            Outcome::PermanentFailure { .. } => "permanent_failure",
            Outcome::Skipped { .. } => "skipped",
        }
    }
}
