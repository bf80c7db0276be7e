// src/exec/retry.rs

//! Bounded retry around a single task body.
//!
//! Each attempt runs the body, validates its data against the task's
//! contract, and classifies any failure. Retry eligibility is decided by
//! [`RetryPolicy::should_retry`]; delays go through the injected runtime.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::context::TaskContext;
use super::runtime::{RuntimeEnvironment, Stopwatch};
use crate::contract::{ContractValidation, validate_contract};
use crate::engine::task::{TaskDefinition, TaskExecution};
use crate::trace::{TaskAttemptTrace, TaskTrace};
use crate::types::{ErrorCode, RetryCondition};

/// Message recorded when a task's output fails its contract.
pub const CONTRACT_VIOLATION_MESSAGE: &str = "task output contract violation";

/// Message recorded if the attempt loop ends without a terminal trace.
pub const ATTEMPTS_EXHAUSTED_MESSAGE: &str = "task attempts exhausted";

/// Per-task retry configuration.
///
/// The default policy makes exactly one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff_ms: u64,
    pub jitter_ms: u64,
    pub retry_if: RetryCondition,
}

impl RetryPolicy {
    pub fn new(retries: u32) -> Self {
        Self {
            retries,
            ..Self::default()
        }
    }

    pub fn with_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.backoff_ms = backoff_ms;
        self
    }

    pub fn with_jitter_ms(mut self, jitter_ms: u64) -> Self {
        self.jitter_ms = jitter_ms;
        self
    }

    pub fn with_retry_if(mut self, retry_if: RetryCondition) -> Self {
        self.retry_if = retry_if;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Whether a failure on `attempt` (1-based) earns another attempt.
    /// The final allowed attempt is never retried.
    pub fn should_retry(&self, code: ErrorCode, attempt: u32) -> bool {
        attempt < self.max_attempts() && self.retry_if.matches(code)
    }

    /// Delay before the attempt following `attempt`:
    /// `backoff_ms * 2^(attempt - 1) + jitter_sample * jitter_ms`, floored at zero.
    pub fn delay_for(&self, attempt: u32, jitter_sample: f64) -> Duration {
        let backoff = if self.backoff_ms > 0 {
            let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
            self.backoff_ms as f64 * 2f64.powi(exponent)
        } else {
            0.0
        };
        let jitter = if self.jitter_ms > 0 {
            jitter_sample * self.jitter_ms as f64
        } else {
            0.0
        };

        // `as` saturates, so huge or NaN delays clamp instead of wrapping.
        let micros = ((backoff + jitter).max(0.0) * 1000.0).round() as u64;
        Duration::from_micros(micros)
    }
}

/// Outcome of one attempt before retry bookkeeping.
enum AttemptOutcome {
    Passed(TaskTrace),
    Failed(TaskTrace),
}

/// Run `task` under `policy`, returning its final trace.
///
/// Never fails: body errors, panics and contract violations all end up in
/// the returned trace. The attempt history is attached only when more than
/// one attempt ran.
pub async fn run_with_retry(
    task: &TaskDefinition,
    policy: RetryPolicy,
    ctx: TaskContext,
    runtime: &dyn RuntimeEnvironment,
) -> TaskTrace {
    let max_attempts = policy.max_attempts();
    let mut history: Vec<TaskAttemptTrace> = Vec::new();

    for attempt in 1..=max_attempts {
        let outcome = run_attempt(task, ctx.clone(), runtime, attempt, &mut history).await;

        let trace = match outcome {
            AttemptOutcome::Passed(trace) => return attach_history(trace, history),
            AttemptOutcome::Failed(trace) => trace,
        };

        let code = trace.error_code.unwrap_or(ErrorCode::TaskExecutionFailure);
        if !policy.should_retry(code, attempt) {
            return attach_history(trace, history);
        }

        let jitter_sample = if policy.jitter_ms > 0 {
            runtime.random()
        } else {
            0.0
        };
        let delay = policy.delay_for(attempt, jitter_sample);
        debug!(task = %task.id, attempt, code = %code, ?delay, "retrying task");
        if !delay.is_zero() {
            runtime.sleep(delay).await;
        }
    }

    let timing = Stopwatch::instant(runtime);
    TaskTrace::error(
        task.id.clone(),
        timing,
        ErrorCode::TaskExecutionFailure,
        ATTEMPTS_EXHAUSTED_MESSAGE,
    )
    .with_attempts(history)
}

async fn run_attempt(
    task: &TaskDefinition,
    ctx: TaskContext,
    runtime: &dyn RuntimeEnvironment,
    attempt: u32,
    history: &mut Vec<TaskAttemptTrace>,
) -> AttemptOutcome {
    let watch = Stopwatch::start(runtime);

    let executed = AssertUnwindSafe(async { (task.run)(ctx).await })
        .catch_unwind()
        .await;

    let execution: TaskExecution = match executed {
        Ok(Ok(execution)) => execution,
        Ok(Err(err)) => {
            let message = format!("{err:#}");
            return execution_failure(task, &watch, runtime, attempt, message, history);
        }
        Err(panic) => {
            let message = format!("task panicked: {}", super::panic_message(panic.as_ref()));
            return execution_failure(task, &watch, runtime, attempt, message, history);
        }
    };

    let TaskExecution {
        data,
        raw_output,
        input,
        meta,
    } = execution;

    match validate_contract(task.contract.as_ref(), data).await {
        ContractValidation::Valid(output) => {
            let timing = watch.finish(runtime);
            history.push(TaskAttemptTrace::ok(attempt, timing.clone()));
            AttemptOutcome::Passed(
                TaskTrace::ok(task.id.clone(), timing, output)
                    .with_execution_details(input, raw_output, meta),
            )
        }
        ContractValidation::Invalid(issues) => {
            let timing = watch.finish(runtime);
            history.push(TaskAttemptTrace::error(
                attempt,
                timing.clone(),
                ErrorCode::ContractOutputViolation,
                CONTRACT_VIOLATION_MESSAGE,
            ));
            AttemptOutcome::Failed(
                TaskTrace::error(
                    task.id.clone(),
                    timing,
                    ErrorCode::ContractOutputViolation,
                    CONTRACT_VIOLATION_MESSAGE,
                )
                .with_execution_details(input, raw_output, meta)
                .with_contract_issues(issues),
            )
        }
    }
}

fn execution_failure(
    task: &TaskDefinition,
    watch: &Stopwatch,
    runtime: &dyn RuntimeEnvironment,
    attempt: u32,
    message: String,
    history: &mut Vec<TaskAttemptTrace>,
) -> AttemptOutcome {
    let timing = watch.finish(runtime);
    history.push(TaskAttemptTrace::error(
        attempt,
        timing.clone(),
        ErrorCode::TaskExecutionFailure,
        message.clone(),
    ));
    AttemptOutcome::Failed(TaskTrace::error(
        task.id.clone(),
        timing,
        ErrorCode::TaskExecutionFailure,
        message,
    ))
}

fn attach_history(trace: TaskTrace, history: Vec<TaskAttemptTrace>) -> TaskTrace {
    if history.len() > 1 {
        trace.with_attempts(history)
    } else {
        trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{AnyContract, FnContract, RawIssue};
    use crate::exec::SystemRuntime;
    use crate::types::TaskStatus;
    use serde_json::{Value, json};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ctx() -> TaskContext {
        TaskContext::new(
            Arc::new(BTreeMap::new()),
            Arc::new(BTreeMap::new()),
            BTreeMap::new(),
        )
    }

    fn flaky(failures: u32) -> (TaskDefinition, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let task = TaskDefinition::new("flaky", AnyContract, move |_ctx| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n <= failures {
                    anyhow::bail!("attempt {n} failed");
                }
                Ok(json!({ "attempt": n }))
            }
        });
        (task, calls)
    }

    #[test]
    fn delay_doubles_per_attempt_plus_jitter() {
        let policy = RetryPolicy::new(3).with_backoff_ms(100).with_jitter_ms(20);
        assert_eq!(policy.delay_for(1, 0.0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2, 0.0), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3, 0.5), Duration::from_millis(410));
    }

    #[test]
    fn delay_is_floored_at_zero() {
        let policy = RetryPolicy::new(1).with_jitter_ms(10);
        assert_eq!(policy.delay_for(1, -5.0), Duration::ZERO);
        assert_eq!(RetryPolicy::default().delay_for(1, 0.9), Duration::ZERO);
    }

    #[test]
    fn last_attempt_is_never_retried() {
        let policy = RetryPolicy::new(2);
        assert!(policy.should_retry(ErrorCode::TaskExecutionFailure, 1));
        assert!(policy.should_retry(ErrorCode::ContractOutputViolation, 2));
        assert!(!policy.should_retry(ErrorCode::TaskExecutionFailure, 3));

        let contract_only = policy.with_retry_if(RetryCondition::ContractViolation);
        assert!(!contract_only.should_retry(ErrorCode::TaskExecutionFailure, 1));
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let policy: RetryPolicy = serde_json::from_value(json!({ "retries": 2 })).unwrap();
        assert_eq!(policy, RetryPolicy::new(2));
        assert_eq!(policy.retry_if, RetryCondition::Error);
    }

    #[tokio::test]
    async fn single_success_has_no_attempt_history() {
        let (task, calls) = flaky(0);
        let trace = run_with_retry(&task, RetryPolicy::new(2), ctx(), &SystemRuntime).await;
        assert_eq!(trace.status, TaskStatus::Ok);
        assert!(trace.attempts.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success_and_records_history() {
        let (task, calls) = flaky(1);
        let policy = RetryPolicy::new(2).with_retry_if(RetryCondition::ExecutionError);
        let trace = run_with_retry(&task, policy, ctx(), &SystemRuntime).await;

        assert_eq!(trace.status, TaskStatus::Ok);
        assert_eq!(trace.output, Some(json!({ "attempt": 2 })));
        let attempts = trace.attempts.expect("history");
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].status, TaskStatus::Error);
        assert_eq!(attempts[0].error.as_deref(), Some("attempt 1 failed"));
        assert_eq!(attempts[1].status, TaskStatus::Ok);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausting_retries_returns_last_failure() {
        let (task, calls) = flaky(u32::MAX);
        let trace = run_with_retry(&task, RetryPolicy::new(2), ctx(), &SystemRuntime).await;

        assert_eq!(trace.status, TaskStatus::Error);
        assert_eq!(trace.error_code, Some(ErrorCode::TaskExecutionFailure));
        assert_eq!(trace.error.as_deref(), Some("attempt 3 failed"));
        assert_eq!(trace.attempts.map(|a| a.len()), Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_matching_failure_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let contract = FnContract::new(|_: &Value| Err(vec![RawIssue::at(["claims"], "expected array")]));
        let task = TaskDefinition::new("draft", contract, move |_ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(json!({ "claims": "nope" })) }
        });
        let policy = RetryPolicy::new(3).with_retry_if(RetryCondition::ExecutionError);
        let trace = run_with_retry(&task, policy, ctx(), &SystemRuntime).await;

        assert_eq!(trace.error_code, Some(ErrorCode::ContractOutputViolation));
        assert_eq!(trace.error.as_deref(), Some(CONTRACT_VIOLATION_MESSAGE));
        assert_eq!(trace.contract_issues.unwrap()[0].path, "claims");
        assert!(trace.attempts.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn contract_violation_keeps_execution_details() {
        let contract = FnContract::new(|_: &Value| Err(Vec::new()));
        let task = TaskDefinition::new("draft", contract, |_ctx| async {
            Ok(TaskExecution::new(json!(1))
                .with_raw_output("1")
                .with_input(json!({ "prompt": "p" })))
        });
        let trace = run_with_retry(&task, RetryPolicy::default(), ctx(), &SystemRuntime).await;
        assert_eq!(trace.raw_output.as_deref(), Some("1"));
        assert_eq!(trace.input, Some(json!({ "prompt": "p" })));
        assert_eq!(trace.output, None);
    }

    #[tokio::test]
    async fn panicking_body_is_classified() {
        let task = TaskDefinition::new("boom", AnyContract, |_ctx| async {
            if true {
                panic!("kaboom");
            }
            Ok(Value::Null)
        });
        let trace = run_with_retry(&task, RetryPolicy::default(), ctx(), &SystemRuntime).await;
        assert_eq!(trace.error_code, Some(ErrorCode::TaskExecutionFailure));
        assert_eq!(trace.error.as_deref(), Some("task panicked: kaboom"));
    }

    #[tokio::test]
    async fn error_context_chain_is_rendered() {
        let task = TaskDefinition::new("ctx", AnyContract, |_ctx| async {
            Err::<Value, _>(anyhow::anyhow!("socket closed").context("calling provider"))
        });
        let trace = run_with_retry(&task, RetryPolicy::default(), ctx(), &SystemRuntime).await;
        assert_eq!(trace.error.as_deref(), Some("calling provider: socket closed"));
    }
}
