//! Fetch error type for retry classification.

/// Error returned by a single fetch. Kept free of client types so scripted
/// fetchers in tests can produce every variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The URL could not be parsed or has no http(s) scheme.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// Request did not complete within the timeout.
    #[error("request timed out")]
    Timeout,
    /// Connect, DNS or transport failure.
    #[error("connection: {0}")]
    Connection(String),
    /// Response started but the body could not be read completely.
    #[error("body: {0}")]
    Body(String),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Status(u16),
    /// Anything the client reported that fits none of the above.
    #[error("{0}")]
    Other(String),
}
