//! One record: retry-wrapped fetch → verify → store → checkpoint.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::checkpoint::{CheckpointRecord, CheckpointStore, FailureRecord};
use crate::checksum;
use crate::fetch::Fetcher;
use crate::manifest::ManifestRecord;
use crate::outcome::Outcome;
use crate::retry::{self, AttemptError, Exhausted, RetryPolicy};
use crate::storage::ContentStore;

/// Everything a task needs; cheap to clone (shared parts are behind `Arc`).
pub struct PipelineContext<F> {
    pub fetcher: Arc<F>,
    pub store: Arc<CheckpointStore>,
    pub content: ContentStore,
    pub policy: RetryPolicy,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum records in flight.
    pub batch_size: usize,
}

impl<F> Clone for PipelineContext<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            store: Arc::clone(&self.store),
            content: self.content.clone(),
            policy: self.policy,
            timeout: self.timeout,
            batch_size: self.batch_size,
        }
    }
}

/// Run one record to a terminal outcome and record failures in their sinks.
///
/// Every mismatched attempt adds a line to the mismatch log; a URL whose last
/// attempt failed for any other reason adds one line to the failed log.
///
/// Success is checkpointed inside the attempt, so a `Success` returned here is
/// already durable and in the resume set.
pub async fn process_record<F: Fetcher>(
    ctx: &PipelineContext<F>,
    record: ManifestRecord,
    progress: Option<&UnboundedSender<Outcome>>,
) -> Outcome {
    if record.url.contains(['\n', '\r']) {
        // No sink line can hold it.
        tracing::error!("FAILED: {:?} - URL contains a line break", record.url);
        return Outcome::PermanentFailure {
            url: record.url,
            error: "URL contains a line break".to_string(),
        };
    }

    let key = ctx.store.resume_key().await;
    if ctx
        .store
        .contains(key.of(&record.url, &record.expected_hash))
        .await
    {
        tracing::info!("SKIPPED: {}", record.url);
        return Outcome::Skipped { url: record.url };
    }

    let url = record.url.clone();
    let result = retry::run_with_retry(
        &ctx.policy,
        |attempt| {
            let ctx = ctx.clone();
            let record = record.clone();
            async move {
                tracing::debug!(url = %record.url, attempt, "attempt starting");
                // A panic inside the attempt is contained here and costs one attempt.
                match tokio::spawn(attempt_once(ctx, record)).await {
                    Ok(res) => res,
                    Err(e) => Err(AttemptError::Aborted(e.to_string())),
                }
            }
        },
        |attempt, error, delay| {
            tracing::warn!(
                url = %url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "attempt failed, retrying: {}",
                error
            );
            if let Some(tx) = progress {
                let _ = tx.send(Outcome::TransientFailure {
                    url: url.clone(),
                    error: error.to_string(),
                });
            }
        },
    )
    .await;

    let outcome = match result {
        Ok(computed_hash) => {
            tracing::info!("SUCCESS: {}", url);
            Outcome::Success {
                url,
                expected_hash: record.expected_hash,
                computed_hash,
            }
        }
        Err(Exhausted {
            error: AttemptError::Mismatch { expected, computed },
            attempts,
        }) => {
            tracing::error!(
                attempts,
                "FAILED: {} - hash mismatch (expected {}, computed {})",
                url,
                expected,
                computed
            );
            Outcome::HashMismatch {
                url,
                expected_hash: expected,
                computed_hash: computed,
            }
        }
        Err(Exhausted { error, attempts }) => {
            tracing::error!(attempts, "FAILED: {} - {}", url, error);
            Outcome::PermanentFailure {
                url,
                error: format!("{} (after {} attempt(s))", error, attempts),
            }
        }
    };

    record_failure(&ctx.store, &outcome).await;
    outcome
}

/// A single fetch/verify/store/checkpoint pass. Returns the computed hash.
async fn attempt_once<F: Fetcher>(
    ctx: PipelineContext<F>,
    record: ManifestRecord,
) -> Result<String, AttemptError> {
    if let Err(e) = ctx.store.append_processed(&record.url).await {
        tracing::warn!(url = %record.url, "could not write processed log: {}", e);
    }

    let bytes = ctx.fetcher.fetch(&record.url, ctx.timeout).await?;
    let verification = checksum::verify(&bytes, &record.expected_hash);
    if !verification.matched {
        tracing::warn!(
            url = %record.url,
            expected = %record.expected_hash,
            computed = %verification.computed_hash,
            "hash mismatch"
        );
        let failure = FailureRecord::Mismatch {
            url: record.url.clone(),
            expected_hash: record.expected_hash.clone(),
            computed_hash: verification.computed_hash.clone(),
        };
        if let Err(e) = ctx.store.append_failure(&failure).await {
            tracing::error!(url = %record.url, "could not record mismatch: {}", e);
        }
        return Err(AttemptError::Mismatch {
            expected: record.expected_hash,
            computed: verification.computed_hash,
        });
    }

    let path = ctx
        .content
        .write(verification.computed_hash.clone(), bytes)
        .await
        .map_err(AttemptError::Storage)?;
    tracing::debug!(url = %record.url, path = %path.display(), "content stored");

    let checkpoint = CheckpointRecord {
        url: record.url,
        expected_hash: record.expected_hash,
        computed_hash: verification.computed_hash,
    };
    ctx.store
        .append_success(&checkpoint)
        .await
        .map_err(AttemptError::Checkpoint)?;
    Ok(checkpoint.computed_hash)
}

/// Mismatches are already in their sink (one line per mismatched attempt);
/// only unreachable URLs are written here.
async fn record_failure(store: &CheckpointStore, outcome: &Outcome) {
    let Outcome::PermanentFailure { url, .. } = outcome else {
        return;
    };
    let failure = FailureRecord::Unreachable { url: url.clone() };
    if let Err(e) = store.append_failure(&failure).await {
        tracing::error!(url = %failure.url(), "could not record failure: {}", e);
    }
}
