//! Run-wide shutdown signal.
//!
//! Raising the signal stops the dispatcher from admitting new records.
//! Tasks already admitted keep running until they reach a terminal outcome.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    raised: AtomicBool,
    notify: Notify,
}

/// Cloneable handle; every clone observes the same flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Idempotent.
    pub fn trigger(&self) {
        if !self.inner.raised.swap(true, Ordering::AcqRel) {
            tracing::info!("shutdown requested; no new downloads will be started");
        }
        self.inner.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.raised.load(Ordering::Acquire)
    }

    /// Resolves once the signal has been raised.
    pub async fn triggered(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}
