//! Append-only checkpoint sinks opened once per run.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::record::{CheckpointRecord, FailureRecord, RecordError};
use super::resume_set::{ResumeKey, ResumeSet};

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Record(#[from] RecordError),
}

impl CheckpointError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Locations of the checkpoint sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointPaths {
    pub success: PathBuf,
    pub mismatch: PathBuf,
    pub failed: PathBuf,
    /// Optional audit trail of every attempt start.
    pub processed: Option<PathBuf>,
}

struct Sink {
    path: PathBuf,
    file: File,
}

impl Sink {
    async fn open(path: &Path) -> Result<Self, CheckpointError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(CheckpointError::io(parent))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(CheckpointError::io(path))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Write one line and force it to stable storage.
    async fn append_durable(&mut self, line: &str) -> Result<(), CheckpointError> {
        self.file
            .write_all(line.as_bytes())
            .await
            .map_err(CheckpointError::io(&self.path))?;
        self.file
            .flush()
            .await
            .map_err(CheckpointError::io(&self.path))?;
        self.file
            .sync_data()
            .await
            .map_err(CheckpointError::io(&self.path))
    }

    async fn close(mut self) -> Result<(), CheckpointError> {
        self.file
            .flush()
            .await
            .map_err(CheckpointError::io(&self.path))?;
        self.file
            .sync_all()
            .await
            .map_err(CheckpointError::io(&self.path))
    }
}

struct SuccessLog {
    sink: Sink,
    resume: ResumeSet,
}

/// Open handles on every sink plus the in-memory resume set.
///
/// The success log and the resume set share one lock, so a key is only ever
/// visible after its line has been synced.
pub struct CheckpointStore {
    success: Mutex<SuccessLog>,
    mismatch: Mutex<Sink>,
    failed: Mutex<Sink>,
    processed: Option<Mutex<Sink>>,
}

impl CheckpointStore {
    /// Open all sinks for the run and rebuild the resume set from the success log.
    ///
    /// A partially written trailing line (crash mid-append) is truncated so the
    /// next append starts on a fresh line.
    pub async fn open(paths: &CheckpointPaths, key: ResumeKey) -> Result<Self, CheckpointError> {
        let existing = read_if_exists(&paths.success).await?;
        let (resume, complete_len) = parse_success_log(&existing, key);
        if complete_len < existing.len() {
            tracing::warn!(
                path = %paths.success.display(),
                dropped_bytes = existing.len() - complete_len,
                "truncating partial trailing checkpoint line"
            );
            let f = OpenOptions::new()
                .write(true)
                .open(&paths.success)
                .await
                .map_err(CheckpointError::io(&paths.success))?;
            f.set_len(complete_len as u64)
                .await
                .map_err(CheckpointError::io(&paths.success))?;
            f.sync_all()
                .await
                .map_err(CheckpointError::io(&paths.success))?;
        }
        tracing::info!(
            path = %paths.success.display(),
            completed = resume.len(),
            "loaded checkpoint log"
        );

        let processed = match &paths.processed {
            Some(p) => Some(Mutex::new(Sink::open(p).await?)),
            None => None,
        };
        Ok(Self {
            success: Mutex::new(SuccessLog {
                sink: Sink::open(&paths.success).await?,
                resume,
            }),
            mismatch: Mutex::new(Sink::open(&paths.mismatch).await?),
            failed: Mutex::new(Sink::open(&paths.failed).await?),
            processed,
        })
    }

    /// Durably append a success line, then add its key to the resume set.
    pub async fn append_success(&self, record: &CheckpointRecord) -> Result<(), CheckpointError> {
        let line = record.encode()?;
        let mut log = self.success.lock().await;
        log.sink.append_durable(&line).await?;
        log.resume.insert_record(record);
        Ok(())
    }

    /// Durably append a terminal failure to the mismatch or failed-URL sink.
    pub async fn append_failure(&self, record: &FailureRecord) -> Result<(), CheckpointError> {
        let line = record.encode()?;
        let sink = match record {
            FailureRecord::Mismatch { .. } => &self.mismatch,
            FailureRecord::Unreachable { .. } => &self.failed,
        };
        sink.lock().await.append_durable(&line).await
    }

    /// Note that an attempt for `url` is starting. No-op without a processed sink.
    pub async fn append_processed(&self, url: &str) -> Result<(), CheckpointError> {
        let Some(sink) = &self.processed else {
            return Ok(());
        };
        if url.contains(['\n', '\r']) {
            return Err(RecordError::LineBreak.into());
        }
        let mut sink = sink.lock().await;
        let path = sink.path.clone();
        sink.file
            .write_all(format!("{}\n", url).as_bytes())
            .await
            .map_err(CheckpointError::io(&path))?;
        sink.file.flush().await.map_err(CheckpointError::io(&path))
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.success.lock().await.resume.contains(key)
    }

    pub async fn resume_key(&self) -> ResumeKey {
        self.success.lock().await.resume.key()
    }

    pub async fn completed_len(&self) -> usize {
        self.success.lock().await.resume.len()
    }

    /// Sync and release every handle.
    pub async fn close(self) -> Result<(), CheckpointError> {
        self.success.into_inner().sink.close().await?;
        self.mismatch.into_inner().close().await?;
        self.failed.into_inner().close().await?;
        if let Some(p) = self.processed {
            p.into_inner().close().await?;
        }
        Ok(())
    }
}

/// Rebuild the resume set from the success log at `path`.
///
/// A missing or empty log yields an empty set; an unterminated last line and
/// malformed lines are skipped.
pub async fn load(path: &Path, key: ResumeKey) -> Result<ResumeSet, CheckpointError> {
    let bytes = read_if_exists(path).await?;
    Ok(parse_success_log(&bytes, key).0)
}

/// Number of complete, non-empty lines in a sink. Missing file counts as 0.
pub async fn count_lines(path: &Path) -> Result<usize, CheckpointError> {
    let bytes = read_if_exists(path).await?;
    let complete = complete_prefix_len(&bytes);
    Ok(bytes[..complete]
        .split(|b| *b == b'\n')
        .filter(|l| !l.is_empty())
        .count())
}

async fn read_if_exists(path: &Path) -> Result<Vec<u8>, CheckpointError> {
    match tokio::fs::read(path).await {
        Ok(b) => Ok(b),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(CheckpointError::io(path)(e)),
    }
}

fn complete_prefix_len(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0)
}

/// Parse every complete line; returns the set and the length of the
/// newline-terminated prefix.
fn parse_success_log(bytes: &[u8], key: ResumeKey) -> (ResumeSet, usize) {
    let complete = complete_prefix_len(bytes);
    let mut resume = ResumeSet::new(key);
    for (idx, raw) in bytes[..complete].split(|b| *b == b'\n').enumerate() {
        if raw.is_empty() {
            continue;
        }
        let parsed = std::str::from_utf8(raw)
            .map_err(|_| "invalid UTF-8".to_string())
            .and_then(|s| CheckpointRecord::decode(s).map_err(|e| e.to_string()));
        match parsed {
            Ok(record) => resume.insert_record(&record),
            Err(e) => tracing::warn!(line = idx + 1, "skipping malformed checkpoint line: {}", e),
        }
    }
    (resume, complete)
}
