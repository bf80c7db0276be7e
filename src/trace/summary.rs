// src/trace/summary.rs

use super::model::{TaskTrace, TraceSummary};
use crate::types::TaskStatus;

/// Count final task statuses. Pure; the same input always yields the
/// same summary.
pub fn summarize(tasks: &[TaskTrace]) -> TraceSummary {
    tasks.iter().fold(
        TraceSummary {
            total: tasks.len(),
            ..TraceSummary::default()
        },
        |mut summary, task| {
            match task.status {
                TaskStatus::Ok => summary.passed += 1,
                TaskStatus::Error => summary.failed += 1,
                TaskStatus::Skipped => summary.skipped += 1,
            }
            summary
        },
    )
}
