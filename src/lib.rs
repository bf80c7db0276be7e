// src/lib.rs

//! Level-parallel task orchestration with output contracts, retries and
//! replayable traces.
//!
//! A [`Pipeline`] holds named tasks with declared dependencies. Running it
//! groups tasks into dependency levels, runs each level concurrently,
//! validates every output against the task's contract, retries failures
//! per policy, and returns a [`PipelineTrace`] describing everything that
//! happened.

pub mod cli;
pub mod config;
pub mod contract;
pub mod dag;
pub mod demo;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod provider;
pub mod trace;
pub mod types;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::trace::{diagnose_failure, read_trace, summarize, write_trace};

pub use crate::contract::{Contract, ContractIssue, JsonSchemaContract, TypedContract};
pub use crate::engine::{LlmTask, Pipeline, PipelineRun, TaskDefinition, TaskExecution};
pub use crate::errors::{ConduktError, Error};
pub use crate::exec::{RetryPolicy, RuntimeEnvironment, SystemRuntime, TaskContext};
pub use crate::trace::{FailureDiagnosis, PipelineTrace, TaskTrace};
pub use crate::types::{ErrorCode, RetryCondition, RunStatus, TaskStatus};

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<ExitCode> {
    match args.command {
        Command::Diagnose { trace } => diagnose(&trace),
        Command::Summarize { trace } => summarize_trace(&trace),
        Command::CheckConfig { config } => check_config(&config),
        Command::Demo { broken, out } => run_demo(broken, &out).await,
    }
}

fn diagnose(path: &Path) -> Result<ExitCode> {
    let trace = read_trace(path).with_context(|| format!("reading trace at {path:?}"))?;
    let diagnosis = diagnose_failure(&trace);
    println!("{}", serde_json::to_string_pretty(&diagnosis)?);

    Ok(if diagnosis.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn summarize_trace(path: &Path) -> Result<ExitCode> {
    let trace = read_trace(path).with_context(|| format!("reading trace at {path:?}"))?;
    let summary = summarize(&trace.tasks);
    if summary != trace.summary {
        debug!(recorded = ?trace.summary, recomputed = ?summary, "trace summary differs from task list");
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(ExitCode::SUCCESS)
}

fn check_config(path: &Path) -> Result<ExitCode> {
    let cfg = load_and_validate(path).with_context(|| format!("loading config at {path:?}"))?;
    info!(path = %path.display(), "config is valid");

    println!("condukt config: {}", path.display());
    println!(
        "  pipeline.name = {}",
        cfg.pipeline.name.as_deref().unwrap_or("<unset>")
    );
    println!("  retry.retries = {}", cfg.retry.retries);
    println!("  retry.backoff_ms = {}", cfg.retry.backoff_ms);
    println!("  retry.jitter_ms = {}", cfg.retry.jitter_ms);
    println!("  retry.retry_if = {}", cfg.retry.retry_if);
    Ok(ExitCode::SUCCESS)
}

async fn run_demo(broken: bool, out: &Path) -> Result<ExitCode> {
    let pipeline = demo::build_demo_pipeline(broken)?;
    let trace = pipeline.run().await?;
    write_trace(out, &trace).with_context(|| format!("writing trace to {out:?}"))?;

    println!("Trace written to {}", out.display());
    println!("Status: {}", if trace.is_ok() { "ok" } else { "failed" });

    let diagnosis = diagnose_failure(&trace);
    if let (Some(task), Some(code)) = (&diagnosis.task, diagnosis.error_code) {
        println!("Failed task: {task}");
        println!("Error code: {code}");
        println!("Error: {}", diagnosis.error.as_deref().unwrap_or_default());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
