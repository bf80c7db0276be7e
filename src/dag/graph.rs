// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::errors::{ConduktError, Result};

/// Task dependency graph with precomputed execution levels.
///
/// Edge direction: dependency -> dependent. For a task `B` with
/// `after = ["A"]` we add the edge `A -> B`.
///
/// Node indices follow registration order, which is what keeps level
/// contents stable regardless of how tasks are named.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    levels: Vec<Vec<String>>,
}

impl DependencyGraph {
    /// Build the graph from `(id, after)` pairs in registration order.
    pub fn build<'a, I>(tasks: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a [String])>,
    {
        let tasks: Vec<(&str, &[String])> = tasks.into_iter().collect();

        let mut graph: DiGraph<String, ()> = DiGraph::with_capacity(tasks.len(), 0);
        let mut index_by_id: HashMap<&str, NodeIndex> = HashMap::with_capacity(tasks.len());

        for (id, _) in &tasks {
            if index_by_id.contains_key(id) {
                return Err(ConduktError::DuplicateTaskId(id.to_string()));
            }
            let idx = graph.add_node(id.to_string());
            index_by_id.insert(*id, idx);
        }

        for (id, after) in &tasks {
            let task_idx = index_by_id[id];
            for dep in after.iter() {
                let dep_idx = index_by_id.get(dep.as_str()).copied().ok_or_else(|| {
                    ConduktError::UnknownDependency {
                        task: id.to_string(),
                        dependency: dep.clone(),
                    }
                })?;
                graph.update_edge(dep_idx, task_idx, ());
            }
        }

        let levels = compute_levels(&graph)?;
        debug!(tasks = graph.node_count(), levels = levels.len(), "dependency graph built");

        Ok(Self { graph, levels })
    }

    /// Execution levels: every dependency of a task sits in a strictly
    /// earlier level; ids inside a level keep registration order.
    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    /// All task ids flattened level by level.
    pub fn task_order(&self) -> Vec<String> {
        self.levels.iter().flatten().cloned().collect()
    }

    /// Immediate dependencies of `id`, in registration order.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Immediate dependents of `id`, in registration order.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: &str, dir: Direction) -> Vec<&str> {
        let Some(idx) = self.graph.node_indices().find(|i| self.graph[*i] == id) else {
            return Vec::new();
        };
        let mut found: Vec<NodeIndex> = self.graph.neighbors_directed(idx, dir).collect();
        found.sort();
        found.into_iter().map(|i| self.graph[i].as_str()).collect()
    }
}

/// Kahn's algorithm, one generation at a time.
fn compute_levels(graph: &DiGraph<String, ()>) -> Result<Vec<Vec<String>>> {
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|idx| graph.neighbors_directed(idx, Direction::Incoming).count())
        .collect();

    let mut ready: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|idx| in_degree[idx.index()] == 0)
        .collect();

    let mut levels = Vec::new();
    let mut placed = 0usize;

    while !ready.is_empty() {
        placed += ready.len();

        let mut next = Vec::new();
        for idx in &ready {
            for child in graph.neighbors_directed(*idx, Direction::Outgoing) {
                let degree = &mut in_degree[child.index()];
                *degree -= 1;
                if *degree == 0 {
                    next.push(child);
                }
            }
        }
        // Children are discovered parent by parent; restore registration order.
        next.sort();

        levels.push(ready.iter().map(|idx| graph[*idx].clone()).collect());
        ready = next;
    }

    if placed != graph.node_count() {
        let unresolved = graph
            .node_indices()
            .filter(|idx| in_degree[idx.index()] > 0)
            .map(|idx| graph[idx].clone())
            .collect();
        return Err(ConduktError::CycleDetected(unresolved));
    }

    Ok(levels)
}
