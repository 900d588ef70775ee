use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::checkpoint::{CheckpointPaths, ResumeKey};
use crate::retry::{Backoff, RetryPolicy};

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per record (including the first).
    pub max_attempts: u32,
    /// Delay in seconds between attempts (e.g. 0.25 = 250ms).
    pub backoff_secs: f64,
    /// Double the delay after each attempt instead of keeping it fixed.
    #[serde(default)]
    pub exponential: bool,
    /// Upper bound on the delay when `exponential` is set.
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

fn default_max_delay_secs() -> u64 {
    30
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_secs: 1.0,
            exponential: false,
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        let base = Duration::from_secs_f64(self.backoff_secs.max(0.0));
        let backoff = if self.exponential {
            Backoff::Exponential {
                base,
                max: Duration::from_secs(self.max_delay_secs),
            }
        } else {
            Backoff::Fixed(base)
        };
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff,
        }
    }
}

/// Global configuration loaded from `~/.config/hashfetch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashfetchConfig {
    /// Directory receiving `<sha256>.<ext>` content files.
    pub output_dir: PathBuf,
    /// Extension of content files (without the dot).
    #[serde(default = "default_extension")]
    pub file_extension: String,
    /// Success log; the source of truth for resume.
    pub checkpoint_file: PathBuf,
    /// One line per terminal hash mismatch.
    pub mismatch_file: PathBuf,
    /// One line per URL that failed after all attempts.
    pub failed_file: PathBuf,
    /// Optional log of every attempt start.
    #[serde(default)]
    pub processed_file: Option<PathBuf>,
    /// Maximum number of records in flight at once.
    pub batch_size: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Field identifying a completed record on resume.
    #[serde(default)]
    pub resume_key: ResumeKey,
    /// Log file; defaults to `~/.local/state/hashfetch/hashfetch.log`.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

fn default_extension() -> String {
    "jpg".to_string()
}

impl Default for HashfetchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("images"),
            file_extension: default_extension(),
            checkpoint_file: PathBuf::from("completed_images_metadata.txt"),
            mismatch_file: PathBuf::from("hash_different.txt"),
            failed_file: PathBuf::from("failed_to_access.txt"),
            processed_file: Some(PathBuf::from("processed_images.txt")),
            batch_size: 20,
            timeout_secs: 10,
            resume_key: ResumeKey::Url,
            log_file: None,
            retry: None,
        }
    }
}

impl HashfetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default().to_policy()
    }

    pub fn checkpoint_paths(&self) -> CheckpointPaths {
        CheckpointPaths {
            success: self.checkpoint_file.clone(),
            mismatch: self.mismatch_file.clone(),
            failed: self.failed_file.clone(),
            processed: self.processed_file.clone(),
        }
    }

    /// Apply `HASHFETCH_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (used by tests).
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HASHFETCH_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("HASHFETCH_LOG_FILE") {
            self.log_file = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("HASHFETCH_BATCH_SIZE") {
            self.batch_size = v
                .parse()
                .with_context(|| format!("HASHFETCH_BATCH_SIZE={v}"))?;
        }
        if let Some(v) = lookup("HASHFETCH_TIMEOUT_SECS") {
            self.timeout_secs = v
                .parse()
                .with_context(|| format!("HASHFETCH_TIMEOUT_SECS={v}"))?;
        }
        if let Some(v) = lookup("HASHFETCH_MAX_ATTEMPTS") {
            let mut retry = self.retry.clone().unwrap_or_default();
            retry.max_attempts = v
                .parse()
                .with_context(|| format!("HASHFETCH_MAX_ATTEMPTS={v}"))?;
            self.retry = Some(retry);
        }
        if let Some(v) = lookup("HASHFETCH_BACKOFF_SECS") {
            let mut retry = self.retry.clone().unwrap_or_default();
            retry.backoff_secs = v
                .parse()
                .with_context(|| format!("HASHFETCH_BACKOFF_SECS={v}"))?;
            self.retry = Some(retry);
        }
        Ok(())
    }

    /// Reject settings the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be at least 1");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be at least 1");
        }
        if let Some(retry) = &self.retry {
            if retry.max_attempts == 0 {
                anyhow::bail!("retry.max_attempts must be at least 1");
            }
            if !retry.backoff_secs.is_finite() || retry.backoff_secs < 0.0 {
                anyhow::bail!("retry.backoff_secs must be a non-negative number");
            }
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("hashfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HashfetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = HashfetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<HashfetchConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: HashfetchConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
