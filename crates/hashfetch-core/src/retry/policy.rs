use std::time::Duration;

/// High-level classification of an attempt failure for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Server asked us to slow down (429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, truncated body).
    Connection,
    /// 5xx other than 503.
    Http5xx(u16),
    /// Any other non-2xx status.
    HttpStatus(u16),
    /// Content hashed to the wrong digest.
    Mismatch,
    /// Unexpected failure (panic in the attempt, unparsable URL, unknown client error).
    Unclassified,
    /// Local disk or checkpoint fault; retrying cannot help.
    Fatal,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorKind::Fatal)
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// `base * 2^(attempt-1)`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay before the retry that follows `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(d) => d,
            Backoff::Exponential { base, max } => {
                let exp = 1u32 << attempt.saturating_sub(1).min(8);
                base.saturating_mul(exp).min(max)
            }
        }
    }
}

/// Bounded retry policy applied per record.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Fixed(Duration::from_secs(1)),
        }
    }
}

impl RetryPolicy {
    /// Decide what to do after `attempt` failed with `kind`.
    ///
    /// `attempt` is 1-based (1 = first attempt). Returns `RetryDecision::NoRetry`
    /// when we should stop retrying.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts || !kind.is_retryable() {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.backoff.delay(attempt))
    }
}
