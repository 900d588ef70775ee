//! Classify HTTP status, fetch errors and attempt errors into retry kinds.

use super::error::AttemptError;
use super::policy::ErrorKind;
use crate::fetch::FetchError;

/// Classify an HTTP status code for retry decisions.
///
/// Every non-2xx status is retryable; 429/503 are singled out as throttling.
pub fn classify_http_status(code: u16) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code),
        _ => ErrorKind::HttpStatus(code),
    }
}

/// Classify a fetch error for retry decisions.
pub fn classify_fetch_error(e: &FetchError) -> ErrorKind {
    match e {
        FetchError::Timeout => ErrorKind::Timeout,
        FetchError::Connection(_) | FetchError::Body(_) => ErrorKind::Connection,
        FetchError::Status(code) => classify_http_status(*code),
        FetchError::InvalidUrl(_) | FetchError::Other(_) => ErrorKind::Unclassified,
    }
}

/// Classify an attempt error into an ErrorKind.
pub fn classify(e: &AttemptError) -> ErrorKind {
    match e {
        AttemptError::Fetch(fe) => classify_fetch_error(fe),
        AttemptError::Mismatch { .. } => ErrorKind::Mismatch,
        AttemptError::Storage(_) | AttemptError::Checkpoint(_) => ErrorKind::Fatal,
        AttemptError::Aborted(_) => ErrorKind::Unclassified,
    }
}
