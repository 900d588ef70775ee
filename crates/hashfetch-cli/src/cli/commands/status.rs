//! `hashfetch status` – count entries in the checkpoint and failure logs.

use anyhow::{Context, Result};
use hashfetch_core::checkpoint::count_lines;
use hashfetch_core::config::HashfetchConfig;
use std::path::Path;

pub async fn run_status(cfg: &HashfetchConfig) -> Result<()> {
    println!("{:<12} {:>8}  {}", "LOG", "ENTRIES", "PATH");
    print_row("completed", &cfg.checkpoint_file).await?;
    print_row("mismatch", &cfg.mismatch_file).await?;
    print_row("failed", &cfg.failed_file).await?;
    if let Some(processed) = &cfg.processed_file {
        print_row("processed", processed).await?;
    }
    Ok(())
}

async fn print_row(label: &str, path: &Path) -> Result<()> {
    let n = count_lines(path)
        .await
        .with_context(|| format!("count {}", path.display()))?;
    println!("{:<12} {:>8}  {}", label, n, path.display());
    Ok(())
}
