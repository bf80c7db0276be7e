// src/trace/mod.rs

//! Run traces and their derived views.
//!
//! - [`model`] holds the serialized trace shapes.
//! - [`summary`] aggregates task statuses.
//! - [`diagnosis`] extracts the first failure boundary.

pub mod diagnosis;
pub mod model;
pub mod summary;

use std::fs;
use std::path::Path;

pub use diagnosis::{FailureDiagnosis, diagnose_failure};
pub use model::{
    ExecutionPlan, PipelineTrace, TaskAttemptTrace, TaskTiming, TaskTrace, TraceSummary,
};
pub use summary::summarize;

use crate::errors::Result;

/// Read a JSON trace from disk.
pub fn read_trace(path: impl AsRef<Path>) -> Result<PipelineTrace> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Write `trace` as pretty JSON with a trailing newline.
pub fn write_trace(path: impl AsRef<Path>, trace: &PipelineTrace) -> Result<()> {
    let mut json = serde_json::to_string_pretty(trace)?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}
