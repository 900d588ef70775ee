//! Run-level tally of terminal outcomes.
//!
//! The dispatcher folds every terminal outcome into a `RunSummary`; the CLI
//! keeps its own copy fed from the progress channel for periodic reports.

use std::fmt;

use crate::outcome::Outcome;

/// Counts per terminal outcome. Item failures are reported here rather than
/// escalated to a process-level error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Manifest records seen by the dispatcher.
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub mismatched: usize,
    pub failed: usize,
    /// Records never admitted because shutdown was requested.
    pub interrupted: usize,
    /// Failed attempts that were retried.
    pub retries: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Success { .. } => self.succeeded += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
            Outcome::HashMismatch { .. } => self.mismatched += 1,
            Outcome::PermanentFailure { .. } => self.failed += 1,
            Outcome::TransientFailure { .. } => self.retries += 1,
        }
    }

    /// Records that reached a terminal outcome (including skips).
    pub fn finished(&self) -> usize {
        self.succeeded + self.skipped + self.mismatched + self.failed
    }

    /// True when nothing ended in a mismatch or failure.
    pub fn is_clean(&self) -> bool {
        self.mismatched == 0 && self.failed == 0 && self.interrupted == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records: {} succeeded, {} skipped, {} hash mismatches, {} failed",
            self.total, self.succeeded, self.skipped, self.mismatched, self.failed
        )?;
        if self.interrupted > 0 {
            write!(f, ", {} not started (shutdown)", self.interrupted)?;
        }
        Ok(())
    }
}
