// src/trace/diagnosis.rs

//! First-failure extraction.

use serde::{Deserialize, Serialize};

use super::model::PipelineTrace;
use crate::types::ErrorCode;

/// The single actionable failure boundary of a run.
///
/// When `failed` is false every optional field is `None` and
/// `contract_paths` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDiagnosis {
    pub pipeline: String,
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub contract_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<String>,
}

/// Find the first task with `error` status, in trace order.
pub fn diagnose_failure(trace: &PipelineTrace) -> FailureDiagnosis {
    let Some((index, task)) = trace.tasks.iter().enumerate().find(|(_, t)| t.is_error()) else {
        return FailureDiagnosis {
            pipeline: trace.pipeline.clone(),
            failed: false,
            task: None,
            task_index: None,
            error_code: None,
            error: None,
            contract_paths: Vec::new(),
            failed_at: None,
        };
    };

    FailureDiagnosis {
        pipeline: trace.pipeline.clone(),
        failed: true,
        task: Some(task.task.clone()),
        task_index: Some(index),
        error_code: task.error_code,
        error: task.error.clone(),
        contract_paths: task
            .contract_issues
            .iter()
            .flatten()
            .map(|issue| issue.path.clone())
            .collect(),
        failed_at: Some(task.finished_at.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trace(tasks: serde_json::Value, status: &str) -> PipelineTrace {
        serde_json::from_value(json!({
            "trace_version": "rs-0.1",
            "pipeline": "research-and-write",
            "status": status,
            "started_at": "2026-02-14T00:00:00.000Z",
            "finished_at": "2026-02-14T00:00:02.000Z",
            "execution": { "mode": "level_parallel", "levels": [["research"], ["draft"]] },
            "task_order": ["research", "draft"],
            "tasks": tasks,
            "summary": { "total": 2, "passed": 1, "failed": 1 }
        }))
        .unwrap()
    }

    #[test]
    fn returns_first_failing_task_boundary() {
        let trace = trace(
            json!([
                {
                    "task": "research", "status": "ok",
                    "started_at": "2026-02-14T00:00:00.000Z",
                    "finished_at": "2026-02-14T00:00:01.000Z",
                    "duration_ms": 1000, "output": { "topics": ["a"] }
                },
                {
                    "task": "draft", "status": "error",
                    "started_at": "2026-02-14T00:00:01.000Z",
                    "finished_at": "2026-02-14T00:00:02.000Z",
                    "duration_ms": 1000,
                    "error_code": "CONTRACT_OUTPUT_VIOLATION",
                    "error": "task output contract violation",
                    "contract_issues": [{ "path": "claims", "message": "expected array" }]
                }
            ]),
            "failed",
        );

        let diagnosis = diagnose_failure(&trace);
        assert!(diagnosis.failed);
        assert_eq!(diagnosis.task.as_deref(), Some("draft"));
        assert_eq!(diagnosis.task_index, Some(1));
        assert_eq!(diagnosis.error_code, Some(ErrorCode::ContractOutputViolation));
        assert_eq!(diagnosis.contract_paths, vec!["claims"]);
        assert_eq!(diagnosis.failed_at.as_deref(), Some("2026-02-14T00:00:02.000Z"));
    }

    #[test]
    fn successful_trace_is_not_failed() {
        let trace = trace(
            json!([{
                "task": "research", "status": "ok",
                "started_at": "2026-02-14T00:00:00.000Z",
                "finished_at": "2026-02-14T00:00:01.000Z",
                "duration_ms": 1000
            }]),
            "ok",
        );

        let diagnosis = diagnose_failure(&trace);
        assert!(!diagnosis.failed);
        assert_eq!(diagnosis.task, None);
        assert!(diagnosis.contract_paths.is_empty());

        let json = serde_json::to_value(&diagnosis).unwrap();
        assert_eq!(
            json,
            json!({ "pipeline": "research-and-write", "failed": false, "contract_paths": [] })
        );
    }

    #[test]
    fn non_contract_failure_has_no_paths() {
        let trace = trace(
            json!([{
                "task": "research", "status": "error",
                "started_at": "2026-02-14T00:00:00.000Z",
                "finished_at": "2026-02-14T00:00:01.000Z",
                "duration_ms": 1000,
                "error_code": "TASK_EXECUTION_FAILURE",
                "error": "boom"
            }]),
            "failed",
        );
        let diagnosis = diagnose_failure(&trace);
        assert_eq!(diagnosis.task_index, Some(0));
        assert!(diagnosis.contract_paths.is_empty());
    }
}
