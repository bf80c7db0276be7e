// src/trace/model.rs

//! Serialized trace shapes.
//!
//! Field names are part of the trace format: downstream tooling reads these
//! JSON documents, so fields may be added but not renamed or removed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::contract::ContractIssue;
use crate::types::{ErrorCode, RunStatus, TaskStatus};

/// Start/finish timestamps plus elapsed milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTiming {
    pub started_at: String,
    pub finished_at: String,
    pub duration_ms: u64,
}

/// One execution attempt inside a task's retry loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAttemptTrace {
    pub attempt: u32,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: String,
    pub finished_at: String,
    pub duration_ms: u64,
}

impl TaskAttemptTrace {
    pub fn ok(attempt: u32, timing: TaskTiming) -> Self {
        Self {
            attempt,
            status: TaskStatus::Ok,
            error_code: None,
            error: None,
            started_at: timing.started_at,
            finished_at: timing.finished_at,
            duration_ms: timing.duration_ms,
        }
    }

    pub fn error(attempt: u32, timing: TaskTiming, code: ErrorCode, error: impl Into<String>) -> Self {
        Self {
            attempt,
            status: TaskStatus::Error,
            error_code: Some(code),
            error: Some(error.into()),
            started_at: timing.started_at,
            finished_at: timing.finished_at,
            duration_ms: timing.duration_ms,
        }
    }
}

/// Outcome of one task for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTrace {
    pub task: String,
    pub status: TaskStatus,
    pub started_at: String,
    pub finished_at: String,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_issues: Option<Vec<ContractIssue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<Vec<TaskAttemptTrace>>,
}

impl TaskTrace {
    fn base(task: impl Into<String>, status: TaskStatus, timing: TaskTiming) -> Self {
        Self {
            task: task.into(),
            status,
            started_at: timing.started_at,
            finished_at: timing.finished_at,
            duration_ms: timing.duration_ms,
            input: None,
            output: None,
            raw_output: None,
            meta: None,
            error: None,
            error_code: None,
            skip_reason: None,
            contract_issues: None,
            attempts: None,
        }
    }

    pub fn ok(task: impl Into<String>, timing: TaskTiming, output: Value) -> Self {
        Self {
            output: Some(output),
            ..Self::base(task, TaskStatus::Ok, timing)
        }
    }

    pub fn error(
        task: impl Into<String>,
        timing: TaskTiming,
        code: ErrorCode,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error_code: Some(code),
            error: Some(error.into()),
            ..Self::base(task, TaskStatus::Error, timing)
        }
    }

    pub fn skipped(task: impl Into<String>, timing: TaskTiming, reason: impl Into<String>) -> Self {
        Self {
            skip_reason: Some(reason.into()),
            ..Self::base(task, TaskStatus::Skipped, timing)
        }
    }

    /// Attach what the task body reported alongside its data.
    pub fn with_execution_details(
        mut self,
        input: Option<Value>,
        raw_output: Option<String>,
        meta: Option<Value>,
    ) -> Self {
        self.input = input;
        self.raw_output = raw_output;
        self.meta = meta;
        self
    }

    pub fn with_contract_issues(mut self, issues: Vec<ContractIssue>) -> Self {
        self.contract_issues = Some(issues);
        self
    }

    pub fn with_attempts(mut self, attempts: Vec<TaskAttemptTrace>) -> Self {
        self.attempts = Some(attempts);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == TaskStatus::Ok
    }

    pub fn is_error(&self) -> bool {
        self.status == TaskStatus::Error
    }
}

/// The computed plan a run followed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub mode: String,
    pub levels: Vec<Vec<String>>,
}

/// Aggregate counts over final task statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    #[serde(default)]
    pub skipped: usize,
}

/// Top-level record of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineTrace {
    pub trace_version: String,
    pub pipeline: String,
    pub status: RunStatus,
    pub started_at: String,
    pub finished_at: String,
    pub execution: ExecutionPlan,
    pub task_order: Vec<String>,
    pub tasks: Vec<TaskTrace>,
    pub summary: TraceSummary,
}

impl PipelineTrace {
    pub fn is_ok(&self) -> bool {
        self.status == RunStatus::Ok
    }

    pub fn task(&self, id: &str) -> Option<&TaskTrace> {
        self.tasks.iter().find(|t| t.task == id)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
