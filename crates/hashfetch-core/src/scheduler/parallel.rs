//! Dispatch manifest records under a global concurrency bound.
//!
//! Records are admitted in manifest order. A record already in the resume set
//! is skipped without taking a slot; every other record waits for a semaphore
//! permit, which its task holds until it reaches a terminal outcome. Finished
//! tasks are joined while the dispatcher waits for a permit.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};

use crate::control::ShutdownSignal;
use crate::fetch::Fetcher;
use crate::manifest::ManifestRecord;
use crate::outcome::Outcome;

use super::progress::RunSummary;
use super::task::{process_record, PipelineContext};

enum Admission {
    Permit(OwnedSemaphorePermit),
    Joined(Result<Outcome, JoinError>),
    Stop,
}

/// Runs every record to a terminal outcome with at most `ctx.batch_size`
/// in flight, then returns the tally.
///
/// Raising `shutdown` stops admission; tasks already admitted still finish.
/// If `progress` is `Some`, every outcome (including retried attempts) is sent
/// on it.
pub async fn run_manifest<F, I>(
    records: I,
    ctx: PipelineContext<F>,
    shutdown: &ShutdownSignal,
    progress: Option<UnboundedSender<Outcome>>,
) -> RunSummary
where
    F: Fetcher,
    I: IntoIterator<Item = ManifestRecord>,
{
    let semaphore = Arc::new(Semaphore::new(ctx.batch_size.max(1)));
    let key = ctx.store.resume_key().await;
    let mut summary = RunSummary::default();
    let mut join_set: JoinSet<Outcome> = JoinSet::new();

    for record in records {
        summary.total += 1;
        if shutdown.is_triggered() {
            summary.interrupted += 1;
            continue;
        }

        if ctx
            .store
            .contains(key.of(&record.url, &record.expected_hash))
            .await
        {
            tracing::info!("SKIPPED: {}", record.url);
            absorb(&mut summary, Ok(Outcome::Skipped { url: record.url }), &progress);
            continue;
        }

        let permit = loop {
            let admission = tokio::select! {
                biased;
                _ = shutdown.triggered() => Admission::Stop,
                Some(res) = join_set.join_next(), if !join_set.is_empty() => Admission::Joined(res),
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(p) => Admission::Permit(p),
                    Err(_) => Admission::Stop,
                },
            };
            match admission {
                Admission::Permit(p) => break Some(p),
                Admission::Joined(res) => absorb(&mut summary, res, &progress),
                Admission::Stop => break None,
            }
        };
        let Some(permit) = permit else {
            summary.interrupted += 1;
            continue;
        };

        let ctx = ctx.clone();
        let progress = progress.clone();
        join_set.spawn(async move {
            let outcome = process_record(&ctx, record, progress.as_ref()).await;
            drop(permit);
            outcome
        });
    }

    while let Some(res) = join_set.join_next().await {
        absorb(&mut summary, res, &progress);
    }

    tracing::info!("run finished: {}", summary);
    summary
}

fn absorb(
    summary: &mut RunSummary,
    res: Result<Outcome, JoinError>,
    progress: &Option<UnboundedSender<Outcome>>,
) {
    match res {
        Ok(outcome) => {
            tracing::debug!(url = %outcome.url(), outcome = outcome.label(), "record finished");
            summary.record(&outcome);
            if let Some(tx) = progress {
                let _ = tx.send(outcome);
            }
        }
        Err(e) => {
            tracing::error!("download task failed: {}", e);
            summary.failed += 1;
        }
    }
}
