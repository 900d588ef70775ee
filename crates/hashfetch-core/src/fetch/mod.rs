//! Single-shot HTTP GET with a per-request timeout.
//!
//! The fetcher never retries; the retry module owns that. [`Fetcher`] is the
//! seam the scheduler is generic over, so tests can plug in scripted or
//! instrumented fetchers.

mod error;
mod http;

use std::future::Future;
use std::time::Duration;

pub use error::FetchError;
pub use http::HttpFetcher;

/// Fetches the full body of one URL.
pub trait Fetcher: Send + Sync + 'static {
    /// Issue one GET for `url`, giving up after `timeout`. A non-2xx status is
    /// an error.
    fn fetch(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}
