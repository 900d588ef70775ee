//! CLI for the hashfetch dataset downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use hashfetch_core::config::{self, HashfetchConfig};
use hashfetch_core::logging::{self, LogTarget};
use std::path::{Path, PathBuf};

use commands::{run_checksum, run_completions, run_manifest, run_status, RunOverrides};

/// Top-level CLI for hashfetch.
#[derive(Debug, Parser)]
#[command(name = "hashfetch")]
#[command(about = "hashfetch: resumable, hash-verified bulk downloader", long_about = None)]
pub struct Cli {
    /// Log to stderr instead of the configured log file.
    #[arg(long, global = true)]
    pub log_stderr: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every record of a manifest, verifying SHA-256 and resuming from the checkpoint log.
    Run {
        /// Manifest file (JSON array or JSON Lines of {image_url, image_sha256}).
        #[arg(long, value_name = "PATH")]
        manifest: PathBuf,
        /// Config file to use instead of ~/.config/hashfetch/config.toml.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
        /// Directory receiving <sha256>.<ext> files.
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
        /// Maximum records in flight.
        #[arg(long, value_name = "N")]
        batch_size: Option<usize>,
        /// Per-request timeout in seconds.
        #[arg(long, value_name = "SECS")]
        timeout_secs: Option<u64>,
        /// Attempts per record, including the first.
        #[arg(long, value_name = "N")]
        max_attempts: Option<u32>,
    },

    /// Show line counts of the success, mismatch and failure logs.
    Status {
        /// Config file to use instead of ~/.config/hashfetch/config.toml.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Compute SHA-256 of a file.
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },

    /// Print a shell completion script to stdout.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let log_stderr = self.log_stderr;
        match self.command {
            CliCommand::Run {
                manifest,
                config,
                output_dir,
                batch_size,
                timeout_secs,
                max_attempts,
            } => {
                let cfg = load_config(config.as_deref(), log_stderr)?;
                let overrides = RunOverrides {
                    output_dir,
                    batch_size,
                    timeout_secs,
                    max_attempts,
                };
                run_manifest(cfg, &manifest, overrides).await?;
            }
            CliCommand::Status { config } => {
                let cfg = load_config(config.as_deref(), log_stderr)?;
                run_status(&cfg).await?;
            }
            CliCommand::Checksum { path } => run_checksum(&path)?,
            CliCommand::Completions { shell } => run_completions(shell),
        }
        Ok(())
    }
}

/// Explicit file or the XDG default, then `HASHFETCH_*` overrides. Logging
/// starts here because the log path is part of the config.
fn load_config(path: Option<&Path>, log_stderr: bool) -> Result<HashfetchConfig> {
    let mut cfg = match path {
        Some(p) => config::load_from_path(p)?,
        None => config::load_or_init()?,
    };
    cfg.apply_env_overrides()?;
    logging::init(&LogTarget::resolve(cfg.log_file.as_deref(), log_stderr));
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

#[cfg(test)]
mod tests;
