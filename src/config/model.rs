// src/config/model.rs

use serde::Deserialize;

use crate::exec::RetryPolicy;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [pipeline]
/// name = "research-and-write"
///
/// [retry]
/// retries = 2
/// backoff_ms = 100
/// jitter_ms = 25
/// retry_if = "execution_error"
/// ```
///
/// Both sections are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Default retry policy for tasks that declare none.
    #[serde(default)]
    pub retry: RawRetrySection,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSection {
    /// Pipeline name used when the caller does not supply one.
    #[serde(default)]
    pub name: Option<String>,
}

/// `[retry]` section. `retry_if` stays a string until validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRetrySection {
    #[serde(default)]
    pub retries: u32,
    #[serde(default)]
    pub backoff_ms: u64,
    #[serde(default)]
    pub jitter_ms: u64,
    #[serde(default)]
    pub retry_if: Option<String>,
}

/// Validated configuration. Only obtainable through
/// `ConfigFile::try_from(RawConfigFile)` or [`Default`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub pipeline: PipelineSection,
    pub retry: RetryPolicy,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(pipeline: PipelineSection, retry: RetryPolicy) -> Self {
        Self { pipeline, retry }
    }
}
