// src/exec/context.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context as _, anyhow};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::trace::TaskTrace;

/// Read-only view of the run handed to a task body or condition.
///
/// Built once per level from the engine's output map, so tasks in the same
/// level all see the same snapshot and never each other's results.
#[derive(Debug, Clone)]
pub struct TaskContext {
    outputs: Arc<BTreeMap<String, Value>>,
    task_results: Arc<BTreeMap<String, TaskTrace>>,
    dependency_outputs: BTreeMap<String, Value>,
}

impl TaskContext {
    pub fn new(
        outputs: Arc<BTreeMap<String, Value>>,
        task_results: Arc<BTreeMap<String, TaskTrace>>,
        dependency_outputs: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            outputs,
            task_results,
            dependency_outputs,
        }
    }

    /// Every output published so far, keyed by task id.
    pub fn outputs(&self) -> &BTreeMap<String, Value> {
        &self.outputs
    }

    /// Every task trace recorded so far, keyed by task id.
    pub fn task_results(&self) -> &BTreeMap<String, TaskTrace> {
        &self.task_results
    }

    /// Outputs of this task's declared `after` dependencies only.
    pub fn dependency_outputs(&self) -> &BTreeMap<String, Value> {
        &self.dependency_outputs
    }

    pub fn dependency(&self, id: &str) -> Option<&Value> {
        self.dependency_outputs.get(id)
    }

    /// Deserialize a dependency's output into `T`.
    pub fn dependency_as<T: DeserializeOwned>(&self, id: &str) -> anyhow::Result<T> {
        let value = self
            .dependency(id)
            .ok_or_else(|| anyhow!("'{id}' is not a dependency of this task"))?;
        serde_json::from_value(value.clone())
            .with_context(|| format!("decoding output of dependency '{id}'"))
    }

    pub fn output(&self, id: &str) -> Option<&Value> {
        self.outputs.get(id)
    }
}
