// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Only construction-time problems (bad graphs, bad config, unreadable
//! traces) surface as [`ConduktError`]. Failures of individual tasks are
//! captured into the trace instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConduktError {
    #[error("duplicate task id '{0}'")]
    DuplicateTaskId(String),

    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("cycle detected in pipeline: {}", .0.join(", "))]
    CycleDetected(Vec<String>),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Contract error: {0}")]
    ContractError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ConduktError>;
