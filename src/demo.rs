// src/demo.rs

//! Bundled quickstart pipeline.
//!
//! Three provider-backed steps (research, draft, verify) answered by a
//! scripted provider, so the engine and trace tooling can be tried without
//! network access. With `broken` set the draft step returns `claims` as a
//! string, which its contract rejects.

use anyhow::{anyhow, bail};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::contract::{JsonSchemaContract, TypedContract};
use crate::engine::{LlmTask, Pipeline};
use crate::errors::Result;
use crate::provider::{JsonProvider, JsonRequest, JsonResponse};

pub const DEMO_PIPELINE_NAME: &str = "quickstart-research-write";
pub const DEMO_MODEL: &str = "demo-model";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Research {
    pub topics: Vec<String>,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub article: String,
    pub claims: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    pub verified: bool,
    pub issues: Vec<String>,
}

/// Provider answering by prompt prefix.
#[derive(Debug, Clone, Copy)]
pub struct DemoProvider {
    broken: bool,
}

impl DemoProvider {
    pub fn new(broken: bool) -> Self {
        Self { broken }
    }

    fn answer(&self, prompt: &str) -> anyhow::Result<Value> {
        if prompt.starts_with("research:") {
            return Ok(json!({
                "topics": ["reusability", "turnaround", "cost"],
                "sources": ["nasa", "spacex", "faa"],
            }));
        }
        if prompt.starts_with("draft:") {
            if self.broken {
                return Ok(json!({
                    "article": "Reusable launch vehicles reduce launch costs.",
                    "claims": "this should be a list, not a string",
                }));
            }
            return Ok(json!({
                "article": "Reusable launch vehicles reduce launch costs and increase launch cadence.",
                "claims": [
                    "Falcon 9 first-stage boosters are reused.",
                    "Turnaround time is a major cost driver.",
                ],
            }));
        }
        if prompt.starts_with("verify:") {
            return Ok(json!({ "verified": true, "issues": [] }));
        }
        bail!("unknown prompt: {prompt}")
    }
}

impl JsonProvider for DemoProvider {
    fn name(&self) -> &str {
        "demo"
    }

    fn generate_json(&self, request: JsonRequest) -> BoxFuture<'_, anyhow::Result<JsonResponse>> {
        let response = self.answer(&request.prompt).map(|data| JsonResponse {
            provider: "demo".to_string(),
            model: request.model.clone(),
            raw_text: data.to_string(),
            data,
            response_id: None,
            usage: None,
        });
        futures::future::ready(response).boxed()
    }
}

fn draft_schema() -> Value {
    json!({
        "type": "object",
        "required": ["article", "claims"],
        "properties": {
            "article": { "type": "string" },
            "claims": { "type": "array", "items": { "type": "string" } }
        }
    })
}

/// Build the quickstart pipeline.
pub fn build_demo_pipeline(broken: bool) -> Result<Pipeline> {
    let provider = DemoProvider::new(broken);

    Pipeline::new(DEMO_PIPELINE_NAME)
        .add_llm_task(
            LlmTask::new(
                "research",
                TypedContract::<Research>::new(),
                provider,
                DEMO_MODEL,
                |_| Ok("research:reusable-launch-vehicles".to_string()),
            )
            .description("collect topics and sources"),
        )?
        .add_llm_task(
            LlmTask::new(
                "draft",
                JsonSchemaContract::new(&draft_schema())?,
                provider,
                DEMO_MODEL,
                |ctx| {
                    let research: Research = ctx.dependency_as("research")?;
                    Ok(format!("draft:{}", research.topics.join(",")))
                },
            )
            .after(["research"]),
        )?
        .add_llm_task(
            LlmTask::new(
                "verify",
                TypedContract::<Verification>::new(),
                provider,
                DEMO_MODEL,
                |ctx| {
                    let draft: Draft = ctx
                        .dependency_as("draft")
                        .map_err(|e| anyhow!("draft output unusable: {e:#}"))?;
                    Ok(format!("verify:{}", draft.claims.len()))
                },
            )
            .after(["draft"]),
        )
}
