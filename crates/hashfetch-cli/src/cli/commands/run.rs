//! `hashfetch run` – process a manifest to completion.

use anyhow::{Context, Result};
use hashfetch_core::config::HashfetchConfig;
use hashfetch_core::control::ShutdownSignal;
use hashfetch_core::fetch::HttpFetcher;
use hashfetch_core::manifest;
use hashfetch_core::outcome::Outcome;
use hashfetch_core::scheduler::{self, RunSummary};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

/// Command-line values that take precedence over config and environment.
#[derive(Debug, Default)]
pub struct RunOverrides {
    pub output_dir: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
}

impl RunOverrides {
    pub fn apply(self, cfg: &mut HashfetchConfig) {
        if let Some(dir) = self.output_dir {
            cfg.output_dir = dir;
        }
        if let Some(n) = self.batch_size {
            cfg.batch_size = n;
        }
        if let Some(secs) = self.timeout_secs {
            cfg.timeout_secs = secs;
        }
        if let Some(n) = self.max_attempts {
            let mut retry = cfg.retry.clone().unwrap_or_default();
            retry.max_attempts = n;
            cfg.retry = Some(retry);
        }
    }
}

/// Item failures do not make this return an error; they are in the summary
/// and the failure logs.
pub async fn run_manifest(
    mut cfg: HashfetchConfig,
    manifest_path: &Path,
    overrides: RunOverrides,
) -> Result<()> {
    overrides.apply(&mut cfg);
    let records = manifest::load_path(manifest_path)?;
    tracing::info!(
        manifest = %manifest_path.display(),
        records = records.len(),
        "manifest loaded"
    );
    let total = records.len();
    let fetcher = Arc::new(HttpFetcher::new().context("build HTTP client")?);

    let shutdown = ShutdownSignal::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\ninterrupt received; finishing downloads already started");
                shutdown.trigger();
            }
        });
    }

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel::<Outcome>();
    let progress_handle = tokio::spawn(async move {
        let mut seen = RunSummary {
            total,
            ..RunSummary::default()
        };
        let mut last_print = Instant::now();
        while let Some(outcome) = progress_rx.recv().await {
            seen.record(&outcome);
            if last_print.elapsed() >= PROGRESS_INTERVAL {
                print_progress(&seen);
                last_print = Instant::now();
            }
        }
        print_progress(&seen);
    });

    let summary =
        scheduler::run_with_config(&cfg, records, fetcher, &shutdown, Some(progress_tx)).await?;
    let _ = progress_handle.await;

    println!("{}", summary);
    if !summary.is_clean() {
        println!(
            "see {} and {} for details",
            cfg.mismatch_file.display(),
            cfg.failed_file.display()
        );
    }
    Ok(())
}

fn print_progress(seen: &RunSummary) {
    println!(
        "  {}/{} done ({} ok, {} skipped, {} mismatch, {} failed, {} retries)",
        seen.finished(),
        seen.total,
        seen.succeeded,
        seen.skipped,
        seen.mismatched,
        seen.failed,
        seen.retries
    );
}
