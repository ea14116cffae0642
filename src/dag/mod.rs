// src/dag/mod.rs

//! Task graph representation.
//!
//! - [`graph`] holds the build-then-freeze arena of [`TaskNode`]s.
//! - [`standard`] wires categories, `clean`, `build` and user composites
//!   into that arena.

pub mod graph;
pub mod standard;

pub use graph::{GraphBuilder, TaskBody, TaskGraph, TaskId, TaskKind, TaskNode};
pub use standard::{build_task_graph, builtin_task_names, composite_order};

pub const CLEAN_TASK: &str = "clean";
pub const CLEAR_CACHE_TASK: &str = "clear-cache";
/// All producers in parallel, without cleaning first.
pub const ASSETS_TASK: &str = "assets";
pub const BUILD_TASK: &str = "build";
