// src/dag/standard.rs

//! The standard task graph: one leaf per category plus `clean` and
//! `clear-cache`, the `assets` fan-out, the `build` sequence, and any
//! composites declared under `[task.*]`.

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::config::{CompositeTaskConfig, ConfigFile};
use crate::dag::graph::{GraphBuilder, TaskGraph};
use crate::dag::{ASSETS_TASK, BUILD_TASK, CLEAN_TASK, CLEAR_CACHE_TASK};
use crate::errors::{PipelineError, Result};
use crate::transform::TransformSet;
use crate::types::Category;

/// Names that `[task.*]` entries may reference without declaring.
pub fn builtin_task_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    names.extend([CLEAN_TASK, CLEAR_CACHE_TASK, ASSETS_TASK, BUILD_TASK]);
    names
}

/// Declared composites ordered so every composite comes after the
/// composites it references.
pub fn composite_order(tasks: &BTreeMap<String, CompositeTaskConfig>) -> Result<Vec<String>> {
    // Edge direction: child -> composite.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for (name, task) in tasks.iter() {
        graph.add_node(name.as_str());
        for child in task.children() {
            if tasks.contains_key(child) {
                graph.add_edge(child.as_str(), name.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(PipelineError::TaskCycle(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}

/// Build and freeze the full graph.
///
/// `build` is `SERIES(clean, PARALLEL(html, styles, scripts, fonts, images))`.
pub fn build_task_graph(cfg: &ConfigFile, transforms: &dyn TransformSet) -> Result<TaskGraph> {
    let mut builder = GraphBuilder::new();

    let mut producers = Vec::with_capacity(Category::ALL.len());
    for category in Category::ALL {
        producers.push(builder.add_leaf(category.as_str(), transforms.producer(category)?)?);
    }
    let clean = builder.add_leaf(CLEAN_TASK, transforms.clean())?;
    builder.add_leaf(CLEAR_CACHE_TASK, transforms.clear_cache())?;

    let assets = builder.add_parallel(ASSETS_TASK, producers)?;
    builder.add_series(BUILD_TASK, vec![clean, assets])?;

    for name in composite_order(cfg.tasks())? {
        let Some(task) = cfg.tasks().get(&name) else {
            continue;
        };
        let children = task
            .children()
            .iter()
            .map(|child| builder.id_of(child))
            .collect::<Result<Vec<_>>>()?;
        debug!(task = %name, children = children.len(), series = task.is_series(), "adding composite task");
        if task.is_series() {
            builder.add_series(name, children)?;
        } else {
            builder.add_parallel(name, children)?;
        }
    }

    Ok(builder.freeze())
}
