//! CLI command handlers, one per file.

mod checksum;
mod completions;
mod run;
mod status;

pub use checksum::run_checksum;
pub use completions::run_completions;
pub use run::{run_manifest, RunOverrides};
pub use status::run_status;
