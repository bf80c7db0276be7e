// src/provider.rs

//! Structured-JSON generation capability consumed by provider-backed tasks.
//!
//! Concrete HTTP adapters live outside this crate; anything that can turn a
//! prompt into parsed JSON (or fail) plugs in through [`JsonProvider`].

use std::sync::Arc;

use anyhow::anyhow;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default character budget for previews embedded in error messages.
pub const DEFAULT_PREVIEW_CHARS: usize = 180;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonResponse {
    pub provider: String,
    pub model: String,
    pub raw_text: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
}

impl JsonResponse {
    /// Build a response by parsing `raw_text` as JSON.
    pub fn from_raw_text(
        provider: impl Into<String>,
        model: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let provider = provider.into();
        let raw_text = raw_text.into();
        let data = parse_json_text(&raw_text, &provider)?;
        Ok(Self {
            provider,
            model: model.into(),
            raw_text,
            data,
            response_id: None,
            usage: None,
        })
    }

    pub fn with_response_id(mut self, id: impl Into<String>) -> Self {
        self.response_id = Some(id.into());
        self
    }

    pub fn with_usage(mut self, usage: Value) -> Self {
        self.usage = Some(usage);
        self
    }
}

pub trait JsonProvider: Send + Sync {
    /// Provider name recorded in task inputs.
    fn name(&self) -> &str;

    /// Produce structured JSON for `request`, or fail.
    fn generate_json(&self, request: JsonRequest) -> BoxFuture<'_, anyhow::Result<JsonResponse>>;
}

impl<P: JsonProvider + ?Sized> JsonProvider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate_json(&self, request: JsonRequest) -> BoxFuture<'_, anyhow::Result<JsonResponse>> {
        (**self).generate_json(request)
    }
}

/// Parse provider text as JSON. The error names the provider and carries a
/// compact preview of the offending text.
pub fn parse_json_text(text: &str, provider: &str) -> anyhow::Result<Value> {
    serde_json::from_str(text).map_err(|e| {
        anyhow!(
            "{provider} response is not valid JSON: {e}; content={}",
            preview_text(text, DEFAULT_PREVIEW_CHARS)
        )
    })
}

/// Collapse whitespace runs and truncate to `max_chars` characters,
/// ending in `...` when shortened.
pub fn preview_text(value: &str, max_chars: usize) -> String {
    let compact = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.chars().count() <= max_chars {
        return compact;
    }
    if max_chars <= 3 {
        return compact.chars().take(max_chars).collect();
    }
    let mut out: String = compact.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}

/// [`preview_text`] over a value's compact JSON rendering.
pub fn preview_json(value: &Value, max_chars: usize) -> String {
    preview_text(&value.to_string(), max_chars)
}
