#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use condukt::contract::AnyContract;
use condukt::engine::TaskDefinition;
use serde_json::Value;

/// Task that always returns `value`.
pub fn static_task(id: &str, value: Value) -> TaskDefinition {
    TaskDefinition::new(id, AnyContract, move |_ctx| {
        let value = value.clone();
        async move { Ok(value) }
    })
}

/// Task whose body always fails with `message`.
pub fn failing_task(id: &str, message: &str) -> TaskDefinition {
    let message = message.to_string();
    TaskDefinition::new(id, AnyContract, move |_ctx| {
        let message = message.clone();
        async move { Err::<Value, _>(anyhow::anyhow!(message)) }
    })
}

/// Task that fails its first `failures` attempts, then returns `value`.
///
/// The returned counter tracks how many times the body ran.
pub fn flaky_task(id: &str, failures: u32, value: Value) -> (TaskDefinition, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let task = TaskDefinition::new(id, AnyContract, move |_ctx| {
        let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
        let value = value.clone();
        async move {
            if attempt <= failures {
                anyhow::bail!("transient failure on attempt {attempt}");
            }
            Ok(value)
        }
    });
    (task, calls)
}

/// Task that sleeps on the tokio timer before returning `value`.
pub fn sleeping_task(id: &str, delay: Duration, value: Value) -> TaskDefinition {
    TaskDefinition::new(id, AnyContract, move |_ctx| {
        let value = value.clone();
        async move {
            tokio::time::sleep(delay).await;
            Ok(value)
        }
    })
}

/// Task that echoes every dependency output it received, keyed by id.
pub fn echo_dependencies_task(id: &str) -> TaskDefinition {
    TaskDefinition::new(id, AnyContract, |ctx| async move {
        let deps: serde_json::Map<String, Value> = ctx
            .dependency_outputs()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Value::Object(deps))
    })
}
