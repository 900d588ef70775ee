//! In-process `Fetcher` with scripted responses and instrumentation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use hashfetch_core::fetch::{FetchError, Fetcher};

#[derive(Debug, Clone)]
pub enum Script {
    /// Always return these bytes.
    Bytes(Vec<u8>),
    /// Always fail with this error.
    Fail(FetchError),
    /// Fail `n` times, then return the bytes.
    FailThen(usize, FetchError, Vec<u8>),
    /// Call `n` gets entry `n - 1`; the last entry repeats.
    Sequence(Vec<Result<Vec<u8>, FetchError>>),
    /// Panic inside the fetch.
    Panic,
}

/// Records calls per URL and the peak number of concurrent fetches.
pub struct ScriptedFetcher {
    scripts: HashMap<String, Script>,
    latency: Duration,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(scripts: Vec<(String, Script)>) -> Self {
        Self {
            scripts: scripts.into_iter().collect(),
            latency: Duration::ZERO,
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            let c = calls.entry(url.to_string()).or_insert(0);
            *c += 1;
            *c
        };
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.scripts.get(url) {
            Some(Script::Bytes(b)) => Ok(b.clone()),
            Some(Script::Fail(e)) => Err(e.clone()),
            Some(Script::FailThen(fails, e, b)) => {
                if n <= *fails {
                    Err(e.clone())
                } else {
                    Ok(b.clone())
                }
            }
            Some(Script::Sequence(steps)) => match steps.get(n - 1).or(steps.last()) {
                Some(step) => step.clone(),
                None => Err(FetchError::Status(404)),
            },
            Some(Script::Panic) => panic!("scripted panic for {url}"),
            None => Err(FetchError::Status(404)),
        }
    }
}
