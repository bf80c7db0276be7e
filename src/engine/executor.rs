// src/engine/executor.rs

//! Level-parallel run loop.
//!
//! Levels run strictly in order. Inside a level every task (dependency
//! resolution, condition, retries, contract validation) runs concurrently
//! against the same snapshot of published outputs; results are applied in
//! registration order once the whole level has settled.

use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::pipeline::Pipeline;
use super::task::{TaskDefinition, TaskId};
use crate::errors::{ConduktError, Result};
use crate::exec::{RetryPolicy, RuntimeEnvironment, Stopwatch, TaskContext, run_with_retry};
use crate::trace::{ExecutionPlan, PipelineTrace, TaskTrace, summarize};
use crate::types::{
    EXECUTION_MODE_LEVEL_PARALLEL, ErrorCode, RunStatus, TRACE_VERSION, TaskStatus,
};

/// Skip reason recorded when a `when` condition evaluates to `false`.
pub const SKIP_REASON_CONDITION_FALSE: &str = "condition returned false";

/// Validated outputs published during a run, keyed by task id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOutputs {
    inner: BTreeMap<TaskId, Value>,
}

impl TaskOutputs {
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.inner.get(id)
    }

    /// Deserialize a published output into `T`; `None` if the task
    /// published nothing.
    pub fn get_as<T: DeserializeOwned>(&self, id: &str) -> Option<serde_json::Result<T>> {
        self.inner
            .get(id)
            .map(|value| serde_json::from_value(value.clone()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TaskId, &Value)> {
        self.inner.iter()
    }

    pub fn into_inner(self) -> BTreeMap<TaskId, Value> {
        self.inner
    }
}

/// Everything a run produced: the trace plus lookup maps.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub trace: PipelineTrace,
    pub outputs: TaskOutputs,
    pub task_results: BTreeMap<TaskId, TaskTrace>,
}

pub(crate) async fn execute(pipeline: &Pipeline) -> Result<PipelineRun> {
    let graph = pipeline.plan()?;
    let runtime = pipeline.runtime();
    let default_retry = pipeline.default_retry();

    let tasks_by_id: HashMap<&str, &TaskDefinition> = pipeline
        .tasks()
        .map(|task| (task.id.as_str(), task))
        .collect();

    let started_at = runtime.now_iso();
    info!(
        pipeline = %pipeline.name(),
        tasks = tasks_by_id.len(),
        levels = graph.levels().len(),
        "pipeline run started"
    );

    let mut outputs: BTreeMap<TaskId, Value> = BTreeMap::new();
    let mut task_results: BTreeMap<TaskId, TaskTrace> = BTreeMap::new();
    let mut traces: Vec<TaskTrace> = Vec::with_capacity(tasks_by_id.len());
    let mut failed = false;

    for (index, level) in graph.levels().iter().enumerate() {
        debug!(level = index, tasks = ?level, "running level");

        let outputs_snapshot = Arc::new(outputs.clone());
        let results_snapshot = Arc::new(task_results.clone());

        let mut pending = Vec::with_capacity(level.len());
        for id in level {
            let task = tasks_by_id.get(id.as_str()).copied().ok_or_else(|| {
                ConduktError::Internal(format!("task '{id}' missing from registry"))
            })?;
            pending.push(run_task(
                task,
                default_retry,
                outputs_snapshot.clone(),
                results_snapshot.clone(),
                runtime,
            ));
        }

        for trace in join_all(pending).await {
            match trace.status {
                TaskStatus::Ok => {
                    if let Some(output) = &trace.output {
                        outputs.insert(trace.task.clone(), output.clone());
                    }
                }
                TaskStatus::Skipped => {
                    info!(task = %trace.task, reason = ?trace.skip_reason, "task skipped");
                }
                TaskStatus::Error => {
                    failed = true;
                    warn!(
                        task = %trace.task,
                        code = ?trace.error_code,
                        error = ?trace.error,
                        "task failed"
                    );
                }
            }
            task_results.insert(trace.task.clone(), trace.clone());
            traces.push(trace);
        }

        if failed {
            debug!(level = index, "level failed; later levels will not run");
            break;
        }
    }

    let summary = summarize(&traces);
    let status = if failed { RunStatus::Failed } else { RunStatus::Ok };
    info!(
        pipeline = %pipeline.name(),
        ?status,
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        skipped = summary.skipped,
        "pipeline run finished"
    );

    let trace = PipelineTrace {
        trace_version: TRACE_VERSION.to_string(),
        pipeline: pipeline.name().to_string(),
        status,
        started_at,
        finished_at: runtime.now_iso(),
        execution: ExecutionPlan {
            mode: EXECUTION_MODE_LEVEL_PARALLEL.to_string(),
            levels: graph.levels().to_vec(),
        },
        task_order: graph.task_order(),
        tasks: traces,
        summary,
    };

    Ok(PipelineRun {
        trace,
        outputs: TaskOutputs { inner: outputs },
        task_results,
    })
}

/// Resolve dependencies, evaluate the condition, then hand off to the
/// retry controller.
async fn run_task(
    task: &TaskDefinition,
    default_retry: RetryPolicy,
    outputs: Arc<BTreeMap<TaskId, Value>>,
    task_results: Arc<BTreeMap<TaskId, TaskTrace>>,
    runtime: &dyn RuntimeEnvironment,
) -> TaskTrace {
    let mut dependency_outputs = BTreeMap::new();
    for dep in &task.after {
        let Some(output) = outputs.get(dep) else {
            return TaskTrace::error(
                task.id.clone(),
                Stopwatch::instant(runtime),
                ErrorCode::TaskDependencyMissing,
                format!("dependency output missing: {dep}"),
            );
        };
        dependency_outputs.insert(dep.clone(), output.clone());
    }

    let ctx = TaskContext::new(outputs, task_results, dependency_outputs);

    if let Some(condition) = &task.when {
        let watch = Stopwatch::start(runtime);
        let evaluated = AssertUnwindSafe(async { condition(ctx.clone()).await })
            .catch_unwind()
            .await;

        match evaluated {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => {
                return TaskTrace::skipped(
                    task.id.clone(),
                    watch.finish(runtime),
                    SKIP_REASON_CONDITION_FALSE,
                );
            }
            Ok(Err(err)) => {
                return TaskTrace::error(
                    task.id.clone(),
                    watch.finish(runtime),
                    ErrorCode::TaskExecutionFailure,
                    format!("task condition failed: {err:#}"),
                );
            }
            Err(panic) => {
                return TaskTrace::error(
                    task.id.clone(),
                    watch.finish(runtime),
                    ErrorCode::TaskExecutionFailure,
                    format!(
                        "task condition failed: condition panicked: {}",
                        crate::exec::panic_message(panic.as_ref())
                    ),
                );
            }
        }
    }

    let policy = task.retry.unwrap_or(default_retry);
    run_with_retry(task, policy, ctx, runtime).await
}
