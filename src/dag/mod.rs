// src/dag/mod.rs

//! Dependency graph and execution levels.
//!
//! - [`graph`] turns task ids plus their `after` lists into an ordered
//!   sequence of levels (topological generations), rejecting duplicate ids,
//!   unknown dependencies and cycles.

pub mod graph;

pub use graph::DependencyGraph;
