#![allow(dead_code, unused_imports)]

pub use condukt_test_utils::builders::{
    echo_dependencies_task, failing_task, flaky_task, sleeping_task, static_task,
};
pub use condukt_test_utils::{FakeRuntime, init_tracing, with_timeout};

use std::sync::Arc;

use condukt::engine::Pipeline;

/// A pipeline named `name` running on a fresh [`FakeRuntime`].
pub fn fake_pipeline(name: &str) -> (Pipeline, Arc<FakeRuntime>) {
    let runtime = Arc::new(FakeRuntime::new());
    let pipeline = Pipeline::new(name).with_runtime(runtime.clone());
    (pipeline, runtime)
}
