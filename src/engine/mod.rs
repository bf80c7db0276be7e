// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - task definitions and their async bodies ([`task`])
//! - provider-backed tasks ([`llm`])
//! - the pipeline builder ([`pipeline`])
//! - the level-parallel run loop ([`executor`])

pub mod executor;
pub mod llm;
pub mod pipeline;
pub mod task;

pub use executor::{PipelineRun, SKIP_REASON_CONDITION_FALSE, TaskOutputs};
pub use llm::{LlmTask, PromptFn, SystemPrompt};
pub use pipeline::Pipeline;
pub use task::{TaskConditionFn, TaskDefinition, TaskExecution, TaskId, TaskRunFn};
