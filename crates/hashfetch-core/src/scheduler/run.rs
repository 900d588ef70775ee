//! Set up a run from configuration and drive it to completion.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::checkpoint::CheckpointStore;
use crate::config::HashfetchConfig;
use crate::control::ShutdownSignal;
use crate::fetch::Fetcher;
use crate::manifest::ManifestRecord;
use crate::outcome::Outcome;
use crate::storage::ContentStore;

use super::parallel::run_manifest;
use super::progress::RunSummary;
use super::task::PipelineContext;

/// Creates the output directory, opens the checkpoint sinks, processes every
/// record and closes the sinks.
///
/// Only setup failures are returned as errors; per-record failures end up in
/// the summary and the failure sinks.
pub async fn run_with_config<F, I>(
    cfg: &HashfetchConfig,
    records: I,
    fetcher: Arc<F>,
    shutdown: &ShutdownSignal,
    progress: Option<UnboundedSender<Outcome>>,
) -> Result<RunSummary>
where
    F: Fetcher,
    I: IntoIterator<Item = ManifestRecord>,
{
    cfg.validate()?;
    let content = ContentStore::new(&cfg.output_dir, cfg.file_extension.clone());
    content
        .ensure_dir()
        .with_context(|| format!("create output dir {}", cfg.output_dir.display()))?;

    let store = CheckpointStore::open(&cfg.checkpoint_paths(), cfg.resume_key)
        .await
        .context("open checkpoint sinks")?;
    let store = Arc::new(store);

    let ctx = PipelineContext {
        fetcher,
        store: Arc::clone(&store),
        content,
        policy: cfg.retry_policy(),
        timeout: cfg.timeout(),
        batch_size: cfg.batch_size,
    };
    tracing::info!(
        output_dir = %cfg.output_dir.display(),
        batch_size = cfg.batch_size,
        timeout_secs = cfg.timeout_secs,
        max_attempts = ctx.policy.max_attempts,
        "starting run"
    );

    let summary = run_manifest(records, ctx, shutdown, progress).await;

    match Arc::try_unwrap(store) {
        Ok(store) => store.close().await.context("close checkpoint sinks")?,
        Err(_) => tracing::warn!("checkpoint sinks still shared at end of run; closing on drop"),
    }
    Ok(summary)
}
