// src/engine/pipeline.rs

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::executor::{self, PipelineRun};
use super::llm::LlmTask;
use super::task::{TaskDefinition, TaskId};
use crate::config::model::ConfigFile;
use crate::dag::DependencyGraph;
use crate::errors::{ConduktError, Result};
use crate::exec::{RetryPolicy, RuntimeEnvironment, SystemRuntime};
use crate::trace::PipelineTrace;

/// A named, ordered collection of tasks.
///
/// Tasks are added through [`Pipeline::add_task`], which consumes the
/// pipeline and hands back the extended one. Ids must be unique and every
/// `after` entry must name a task that is already registered, so a
/// pipeline built this way can never reference unknown tasks.
pub struct Pipeline {
    name: String,
    runtime: Arc<dyn RuntimeEnvironment>,
    default_retry: RetryPolicy,
    tasks: Vec<TaskDefinition>,
    ids: HashSet<TaskId>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            runtime: Arc::new(SystemRuntime),
            default_retry: RetryPolicy::default(),
            tasks: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Pipeline named by `[pipeline] name` (or `fallback_name`) using the
    /// configured `[retry]` policy for tasks that declare none.
    pub fn from_config(config: &ConfigFile, fallback_name: &str) -> Self {
        let name = config.pipeline.name.as_deref().unwrap_or(fallback_name);
        Self::new(name).with_default_retry(config.retry)
    }

    pub fn with_runtime(mut self, runtime: Arc<dyn RuntimeEnvironment>) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_default_retry(mut self, policy: RetryPolicy) -> Self {
        self.default_retry = policy;
        self
    }

    /// Register a task.
    pub fn add_task(mut self, task: TaskDefinition) -> Result<Self> {
        if self.ids.contains(&task.id) {
            return Err(ConduktError::DuplicateTaskId(task.id));
        }
        if let Some(dep) = task.after.iter().find(|dep| !self.ids.contains(*dep)) {
            return Err(ConduktError::UnknownDependency {
                task: task.id.clone(),
                dependency: dep.clone(),
            });
        }

        debug!(pipeline = %self.name, task = %task.id, after = ?task.after, "task registered");
        self.ids.insert(task.id.clone());
        self.tasks.push(task);
        Ok(self)
    }

    /// Register a provider-backed task.
    pub fn add_llm_task(self, task: LlmTask) -> Result<Self> {
        self.add_task(task.into_task())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Registered tasks in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.tasks.iter()
    }

    pub fn default_retry(&self) -> RetryPolicy {
        self.default_retry
    }

    pub(crate) fn runtime(&self) -> &dyn RuntimeEnvironment {
        self.runtime.as_ref()
    }

    /// Compute the execution levels without running anything.
    pub fn plan(&self) -> Result<DependencyGraph> {
        DependencyGraph::build(
            self.tasks
                .iter()
                .map(|task| (task.id.as_str(), task.after.as_slice())),
        )
    }

    /// Run every task and return the trace.
    ///
    /// Task failures are recorded in the trace; only graph and internal
    /// errors are returned as `Err`.
    pub async fn run(&self) -> Result<PipelineTrace> {
        Ok(self.run_detailed().await?.trace)
    }

    /// Like [`Pipeline::run`], also returning outputs and per-task results.
    pub async fn run_detailed(&self) -> Result<PipelineRun> {
        executor::execute(self).await
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("default_retry", &self.default_retry)
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}
