// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Version identifier written into every serialized pipeline trace.
pub const TRACE_VERSION: &str = "rs-0.1";

/// Execution mode recorded in the trace's execution plan.
pub const EXECUTION_MODE_LEVEL_PARALLEL: &str = "level_parallel";

/// Final status of one task in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Ok,
    Error,
    Skipped,
}

/// Overall status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ok,
    Failed,
}

/// Classified task failure recorded in traces.
///
/// - `TaskDependencyMissing`: a declared dependency produced no output
///   (it failed or was skipped upstream).
/// - `ContractOutputViolation`: the task body returned data that its
///   output contract rejected.
/// - `TaskExecutionFailure`: the task body, its condition or its provider
///   returned an error (or panicked), or attempts ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TaskDependencyMissing,
    ContractOutputViolation,
    TaskExecutionFailure,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::TaskDependencyMissing => "TASK_DEPENDENCY_MISSING",
            ErrorCode::ContractOutputViolation => "CONTRACT_OUTPUT_VIOLATION",
            ErrorCode::TaskExecutionFailure => "TASK_EXECUTION_FAILURE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which failure classes a retry policy retries.
///
/// - `Error` (default): any classified failure.
/// - `ExecutionError`: only `TASK_EXECUTION_FAILURE`.
/// - `ContractViolation`: only `CONTRACT_OUTPUT_VIOLATION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryCondition {
    #[default]
    Error,
    ExecutionError,
    ContractViolation,
}

impl RetryCondition {
    /// Whether a failure with `code` is eligible for another attempt.
    pub fn matches(&self, code: ErrorCode) -> bool {
        match self {
            RetryCondition::Error => true,
            RetryCondition::ExecutionError => code == ErrorCode::TaskExecutionFailure,
            RetryCondition::ContractViolation => code == ErrorCode::ContractOutputViolation,
        }
    }
}

impl RetryCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryCondition::Error => "error",
            RetryCondition::ExecutionError => "execution_error",
            RetryCondition::ContractViolation => "contract_violation",
        }
    }
}

impl fmt::Display for RetryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetryCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(RetryCondition::Error),
            "execution_error" => Ok(RetryCondition::ExecutionError),
            "contract_violation" => Ok(RetryCondition::ContractViolation),
            other => Err(format!(
                "invalid retry_if: {other} (expected \"error\", \"execution_error\" or \"contract_violation\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_condition_parses_case_insensitively() {
        assert_eq!(
            "Execution_Error".parse::<RetryCondition>(),
            Ok(RetryCondition::ExecutionError)
        );
        assert!("sometimes".parse::<RetryCondition>().is_err());
        assert_eq!(RetryCondition::ContractViolation.to_string(), "contract_violation");
    }

    #[test]
    fn retry_condition_matching() {
        assert!(RetryCondition::Error.matches(ErrorCode::ContractOutputViolation));
        assert!(RetryCondition::ExecutionError.matches(ErrorCode::TaskExecutionFailure));
        assert!(!RetryCondition::ExecutionError.matches(ErrorCode::ContractOutputViolation));
        assert!(RetryCondition::ContractViolation.matches(ErrorCode::ContractOutputViolation));
        assert!(!RetryCondition::ContractViolation.matches(ErrorCode::TaskExecutionFailure));
    }

    #[test]
    fn error_code_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::TaskDependencyMissing).unwrap();
        assert_eq!(json, "\"TASK_DEPENDENCY_MISSING\"");
        assert_eq!(ErrorCode::TaskExecutionFailure.to_string(), "TASK_EXECUTION_FAILURE");
    }
}
