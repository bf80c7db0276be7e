mod common;

use std::time::{Duration, Instant};

use chrono::DateTime;
use condukt::engine::Pipeline;
use condukt::types::RunStatus;
use common::*;
use serde_json::json;

#[tokio::test]
async fn independent_tasks_in_a_level_run_concurrently() {
    init_tracing();
    let pipeline = Pipeline::new("concurrent")
        .add_task(sleeping_task("left", Duration::from_millis(80), json!("L")))
        .unwrap()
        .add_task(sleeping_task("right", Duration::from_millis(80), json!("R")))
        .unwrap();

    let started = Instant::now();
    let trace = with_timeout(pipeline.run()).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(trace.status, RunStatus::Ok);
    assert_eq!(trace.execution.levels, vec![vec!["left".to_string(), "right".to_string()]]);
    assert!(
        elapsed < Duration::from_millis(150),
        "level took {elapsed:?}, expected close to 80ms"
    );

    let start = |i: usize| {
        DateTime::parse_from_rfc3339(&trace.tasks[i].started_at)
            .unwrap()
            .timestamp_millis()
    };
    let skew = (start(0) - start(1)).abs();
    assert!(skew < 50, "start skew {skew}ms");
}

#[tokio::test]
async fn trace_order_follows_registration_not_completion() {
    let pipeline = Pipeline::new("ordering")
        .add_task(sleeping_task("slow", Duration::from_millis(40), json!(1)))
        .unwrap()
        .add_task(sleeping_task("fast", Duration::from_millis(1), json!(2)))
        .unwrap();

    let trace = with_timeout(pipeline.run()).await.unwrap();
    let ids: Vec<&str> = trace.tasks.iter().map(|t| t.task.as_str()).collect();
    assert_eq!(ids, ["slow", "fast"]);
}
