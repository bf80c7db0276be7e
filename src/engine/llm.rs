// src/engine/llm.rs

//! Provider-backed tasks.
//!
//! An [`LlmTask`] renders a prompt from the run context, asks a
//! [`JsonProvider`] for structured JSON, and records the request and
//! response details in the task trace.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use anyhow::Context as _;
use futures::FutureExt;
use serde_json::{Map, Value, json};

use super::task::{TaskConditionFn, TaskDefinition, TaskExecution, TaskId};
use crate::contract::Contract;
use crate::exec::{RetryPolicy, TaskContext};
use crate::provider::{JsonProvider, JsonRequest};

pub type PromptFn = Arc<dyn Fn(&TaskContext) -> anyhow::Result<String> + Send + Sync>;

/// System prompt: fixed text or rendered from the run context.
#[derive(Clone)]
pub enum SystemPrompt {
    Static(String),
    Dynamic(PromptFn),
}

impl SystemPrompt {
    fn render(&self, ctx: &TaskContext) -> anyhow::Result<String> {
        match self {
            SystemPrompt::Static(text) => Ok(text.clone()),
            SystemPrompt::Dynamic(render) => render(ctx).context("rendering system prompt"),
        }
    }
}

impl fmt::Debug for SystemPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemPrompt::Static(text) => f.debug_tuple("Static").field(text).finish(),
            SystemPrompt::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Definition of a task whose body is a single provider call.
pub struct LlmTask {
    id: TaskId,
    description: Option<String>,
    after: Vec<TaskId>,
    when: Option<TaskConditionFn>,
    retry: Option<RetryPolicy>,
    contract: Arc<dyn Contract>,
    call: ProviderCall,
}

#[derive(Clone)]
struct ProviderCall {
    provider: Arc<dyn JsonProvider>,
    model: String,
    prompt: PromptFn,
    system: Option<SystemPrompt>,
    model_settings: Option<Value>,
}

impl LlmTask {
    pub fn new<C, P, F>(
        id: impl Into<TaskId>,
        contract: C,
        provider: P,
        model: impl Into<String>,
        prompt: F,
    ) -> Self
    where
        C: Contract + 'static,
        P: JsonProvider + 'static,
        F: Fn(&TaskContext) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            description: None,
            after: Vec::new(),
            when: None,
            retry: None,
            contract: Arc::new(contract),
            call: ProviderCall {
                provider: Arc::new(provider),
                model: model.into(),
                prompt: Arc::new(prompt),
                system: None,
                model_settings: None,
            },
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

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

    pub fn when<F, Fut>(mut self, condition: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        self.when = Some(Arc::new(move |ctx| condition(ctx).boxed()));
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.call.system = Some(SystemPrompt::Static(system.into()));
        self
    }

    pub fn system_fn<F>(mut self, render: F) -> Self
    where
        F: Fn(&TaskContext) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.call.system = Some(SystemPrompt::Dynamic(Arc::new(render)));
        self
    }

    pub fn model_settings(mut self, settings: Value) -> Self {
        self.call.model_settings = Some(settings);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Lower into a plain [`TaskDefinition`].
    pub fn into_task(self) -> TaskDefinition {
        let call = Arc::new(self.call);
        let run = move |ctx: TaskContext| {
            let call = call.clone();
            async move { call.execute(ctx).await }
        };

        let mut task = TaskDefinition::new(self.id, self.contract, run);
        task.description = self.description;
        task.after = self.after;
        task.when = self.when;
        task.retry = self.retry;
        task
    }
}

impl fmt::Debug for LlmTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmTask")
            .field("id", &self.id)
            .field("provider", &self.call.provider.name())
            .field("model", &self.call.model)
            .field("after", &self.after)
            .field("system", &self.call.system)
            .finish_non_exhaustive()
    }
}

impl ProviderCall {
    async fn execute(&self, ctx: TaskContext) -> anyhow::Result<TaskExecution> {
        let prompt = (self.prompt)(&ctx).context("rendering prompt")?;
        let system = self
            .system
            .as_ref()
            .map(|system| system.render(&ctx))
            .transpose()?;

        let response = self
            .provider
            .generate_json(JsonRequest {
                model: self.model.clone(),
                prompt: prompt.clone(),
                system: system.clone(),
                settings: self.model_settings.clone(),
            })
            .await?;

        let mut input = Map::new();
        input.insert("provider".into(), json!(self.provider.name()));
        input.insert("model".into(), json!(self.model));
        input.insert("prompt".into(), json!(prompt));
        if let Some(system) = system.filter(|s| !s.is_empty()) {
            input.insert("system".into(), json!(system));
        }
        if let Some(settings) = &self.model_settings {
            input.insert("model_settings".into(), settings.clone());
        }

        let mut meta = Map::new();
        meta.insert("provider".into(), json!(response.provider));
        meta.insert("model".into(), json!(response.model));
        if let Some(id) = &response.response_id {
            meta.insert("response_id".into(), json!(id));
        }
        if let Some(usage) = &response.usage {
            meta.insert("usage".into(), usage.clone());
        }

        Ok(TaskExecution::new(response.data)
            .with_raw_output(response.raw_text)
            .with_input(Value::Object(input))
            .with_meta(Value::Object(meta)))
    }
}
