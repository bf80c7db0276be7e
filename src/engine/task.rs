// src/engine/task.rs

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::contract::Contract;
use crate::exec::{RetryPolicy, TaskContext};

/// Public type alias for task ids throughout the engine.
pub type TaskId = String;

/// What a task body hands back: the data to validate plus optional
/// details recorded verbatim in the trace.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskExecution {
    pub data: Value,
    pub raw_output: Option<String>,
    pub input: Option<Value>,
    pub meta: Option<Value>,
}

impl TaskExecution {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            raw_output: None,
            input: None,
            meta: None,
        }
    }

    pub fn with_raw_output(mut self, raw: impl Into<String>) -> Self {
        self.raw_output = Some(raw.into());
        self
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl From<Value> for TaskExecution {
    fn from(data: Value) -> Self {
        Self::new(data)
    }
}

pub type TaskRunFn =
    Arc<dyn Fn(TaskContext) -> BoxFuture<'static, anyhow::Result<TaskExecution>> + Send + Sync>;

pub type TaskConditionFn =
    Arc<dyn Fn(TaskContext) -> BoxFuture<'static, anyhow::Result<bool>> + Send + Sync>;

/// A registered unit of work. Immutable once added to a pipeline.
#[derive(Clone)]
pub struct TaskDefinition {
    pub(crate) id: TaskId,
    pub(crate) description: Option<String>,
    pub(crate) after: Vec<TaskId>,
    pub(crate) when: Option<TaskConditionFn>,
    pub(crate) retry: Option<RetryPolicy>,
    pub(crate) contract: Arc<dyn Contract>,
    pub(crate) run: TaskRunFn,
}

impl TaskDefinition {
    /// Define a task from its output contract and async body.
    ///
    /// The body may return anything convertible into [`TaskExecution`];
    /// a bare [`Value`] becomes the data with no extra details.
    pub fn new<C, F, Fut, R>(id: impl Into<TaskId>, contract: C, run: F) -> Self
    where
        C: Contract + 'static,
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Into<TaskExecution> + 'static,
    {
        let run: TaskRunFn = Arc::new(move |ctx| {
            let fut = run(ctx);
            async move { fut.await.map(Into::into) }.boxed()
        });

        Self {
            id: id.into(),
            description: None,
            after: Vec::new(),
            when: None,
            retry: None,
            contract: Arc::new(contract),
            run,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare dependencies. Repeated ids are kept once, in first-seen order.
    pub fn after<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskId>,
    {
        for dep in deps {
            let dep = dep.into();
            if !self.after.contains(&dep) {
                self.after.push(dep);
            }
        }
        self
    }

    /// Gate the task on an async condition evaluated against the run context.
    pub fn when<F, Fut>(mut self, condition: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        self.when = Some(Arc::new(move |ctx| condition(ctx).boxed()));
        self
    }

    /// Synchronous form of [`TaskDefinition::when`].
    pub fn when_sync<F>(self, condition: F) -> Self
    where
        F: Fn(&TaskContext) -> bool + Send + Sync + 'static,
    {
        self.when(move |ctx| futures::future::ready(Ok(condition(&ctx))))
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn dependencies(&self) -> &[TaskId] {
        &self.after
    }

    pub fn retry_policy(&self) -> Option<RetryPolicy> {
        self.retry
    }

    pub fn has_condition(&self) -> bool {
        self.when.is_some()
    }
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("after", &self.after)
            .field("when", &self.when.is_some())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
