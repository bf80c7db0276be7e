mod common;

use condukt::ConduktError;
use condukt::dag::DependencyGraph;
use condukt::engine::Pipeline;
use common::*;
use serde_json::json;

#[test]
fn duplicate_registration_fails() {
    let err = Pipeline::new("dup")
        .add_task(static_task("a", json!(1)))
        .unwrap()
        .add_task(static_task("a", json!(2)))
        .unwrap_err();
    assert_eq!(err.to_string(), "duplicate task id 'a'");
}

#[test]
fn unknown_dependency_fails_before_anything_runs() {
    let err = Pipeline::new("unknown")
        .add_task(static_task("only_task", json!(1)).after(["missing_task"]))
        .unwrap_err();
    assert!(matches!(err, ConduktError::UnknownDependency { .. }));
    assert_eq!(
        err.to_string(),
        "task 'only_task' depends on unknown task 'missing_task'"
    );
}

#[test]
fn cycle_names_every_task_involved() {
    let a_after = vec!["B".to_string()];
    let b_after = vec!["A".to_string()];
    let err = DependencyGraph::build([("A", a_after.as_slice()), ("B", b_after.as_slice())])
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains('A') && message.contains('B'), "{message}");
    assert!(matches!(err, ConduktError::CycleDetected(ids) if ids == ["A", "B"]));
}

#[test]
fn cycle_excludes_tasks_that_could_be_placed() {
    let none: Vec<String> = Vec::new();
    let root_dep = vec!["root".to_string(), "y".to_string()];
    let x_dep = vec!["x".to_string()];
    let err = DependencyGraph::build([
        ("root", none.as_slice()),
        ("x", root_dep.as_slice()),
        ("y", x_dep.as_slice()),
    ])
    .unwrap_err();
    assert!(matches!(err, ConduktError::CycleDetected(ids) if ids == ["x", "y"]));
}
