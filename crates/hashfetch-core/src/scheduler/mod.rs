//! Record scheduler.
//!
//! Coordinates the pipeline per manifest record:
//! resume check → retry(fetch → verify → store → checkpoint) → failure sinks,
//! under a global concurrency bound.

mod parallel;
mod progress;
mod run;
mod task;

pub use parallel::run_manifest;
pub use progress::RunSummary;
pub use run::run_with_config;
pub use task::{process_record, PipelineContext};
