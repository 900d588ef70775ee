//! Retry and backoff policy.
//!
//! This module classifies attempt failures (timeouts, throttling, connection
//! failures, hash mismatches, local faults) and decides whether and when to
//! retry, so the scheduler only sees a terminal result per record.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_fetch_error, classify_http_status};
pub use error::AttemptError;
pub use policy::{Backoff, ErrorKind, RetryDecision, RetryPolicy};
pub use run::{run_with_retry, Exhausted};
