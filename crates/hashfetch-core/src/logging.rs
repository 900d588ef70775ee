//! Subscriber setup for the CLI.
//!
//! Events go either to one append-mode log file shared by every thread, or to
//! stderr. Per-record lines (SUCCESS / SKIPPED / FAILED) make the file a
//! journal of each run; its path comes from `log_file` in the config so it can
//! sit next to the checkpoint sinks.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,hashfetch=debug,hashfetch_core=debug";

/// Where log events are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

impl LogTarget {
    /// `prefer_stderr` wins, then the configured file, then
    /// `$XDG_STATE_HOME/hashfetch/hashfetch.log`. Falls back to stderr when no
    /// state dir can be determined.
    pub fn resolve(configured: Option<&Path>, prefer_stderr: bool) -> Self {
        if prefer_stderr {
            return LogTarget::Stderr;
        }
        match configured {
            Some(path) => LogTarget::File(path.to_path_buf()),
            None => default_log_path()
                .map(LogTarget::File)
                .unwrap_or(LogTarget::Stderr),
        }
    }
}

pub fn default_log_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("hashfetch")?;
    Ok(xdg_dirs.get_state_home().join("hashfetch").join("hashfetch.log"))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn open_log(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log dir {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

/// Install the global subscriber writing to `path`.
///
/// Fails when the file cannot be opened or a subscriber is already installed.
pub fn init_file(path: &Path) -> Result<()> {
    let file = open_log(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install subscriber: {}", e))?;
    tracing::info!(path = %path.display(), "logging to file");
    Ok(())
}

/// Install a stderr subscriber. No-op if one is already installed.
pub fn init_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

/// Install a subscriber for `target`, falling back to stderr when the file
/// cannot be used. Returns the target actually in effect.
pub fn init(target: &LogTarget) -> LogTarget {
    match target {
        LogTarget::Stderr => {
            init_stderr();
            LogTarget::Stderr
        }
        LogTarget::File(path) => match init_file(path) {
            Ok(()) => target.clone(),
            Err(e) => {
                init_stderr();
                tracing::warn!("file logging unavailable ({:#}); logging to stderr", e);
                LogTarget::Stderr
            }
        },
    }
}
