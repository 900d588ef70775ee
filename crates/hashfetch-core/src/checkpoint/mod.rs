//! Durable, append-only progress logs and the resume set rebuilt from them.
//!
//! Three sinks: the success log (source of truth for resume), the
//! hash-mismatch log and the failed-URL log. An optional processed log records
//! every attempt start. All appends are serialized per sink and forced to
//! stable storage before returning.

mod record;
mod resume_set;
mod store;

pub use record::{CheckpointRecord, FailureRecord, RecordError, FIELD_SEPARATOR};
pub use resume_set::{ResumeKey, ResumeSet};
pub use store::{count_lines, load, CheckpointError, CheckpointPaths, CheckpointStore};
