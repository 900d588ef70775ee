//! Error returned by one fetch/verify/store attempt.

use crate::checkpoint::CheckpointError;
use crate::fetch::FetchError;

/// Why a single attempt failed. Classified by [`super::classify`] before the
/// retry decision; converted into an `Outcome` once the task is terminal.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    /// The HTTP fetch failed (network, timeout, non-2xx, bad URL).
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Bytes arrived but hashed to something else.
    #[error("hash mismatch: expected {expected}, computed {computed}")]
    Mismatch { expected: String, computed: String },
    /// Writing the content file failed (disk full, permissions). Not retried.
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
    /// Appending the success record failed. Not retried.
    #[error("checkpoint: {0}")]
    Checkpoint(#[source] CheckpointError),
    /// The attempt task panicked or was cancelled.
    #[error("attempt aborted: {0}")]
    Aborted(String),
}
