// src/dag/graph.rs

//! Frozen arena of task nodes.
//!
//! Nodes are added leaves-first through a [`GraphBuilder`]; a composite can
//! only reference [`TaskId`]s that already exist, so forward references and
//! cycles cannot be expressed. [`GraphBuilder::freeze`] yields the immutable
//! [`TaskGraph`] shared by the orchestrator and watcher.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{PipelineError, Result};
use crate::transform::Transform;

/// Handle into a [`TaskGraph`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Leaf,
    Series,
    Parallel,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskKind::Leaf => "leaf",
            TaskKind::Series => "series",
            TaskKind::Parallel => "parallel",
        };
        f.write_str(s)
    }
}

#[derive(Clone)]
pub enum TaskBody {
    Leaf(Arc<dyn Transform>),
    Series(Vec<TaskId>),
    Parallel(Vec<TaskId>),
}

impl fmt::Debug for TaskBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskBody::Leaf(t) => f.debug_tuple("Leaf").field(&t.describe()).finish(),
            TaskBody::Series(c) => f.debug_tuple("Series").field(c).finish(),
            TaskBody::Parallel(c) => f.debug_tuple("Parallel").field(c).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskNode {
    pub name: String,
    pub body: TaskBody,
}

impl TaskNode {
    pub fn kind(&self) -> TaskKind {
        match self.body {
            TaskBody::Leaf(_) => TaskKind::Leaf,
            TaskBody::Series(_) => TaskKind::Series,
            TaskBody::Parallel(_) => TaskKind::Parallel,
        }
    }

    /// Ordered children; empty for leaves.
    pub fn children(&self) -> &[TaskId] {
        match &self.body {
            TaskBody::Leaf(_) => &[],
            TaskBody::Series(c) | TaskBody::Parallel(c) => c,
        }
    }
}

#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<TaskNode>,
    index: HashMap<String, TaskId>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_leaf(&mut self, name: impl Into<String>, transform: Arc<dyn Transform>) -> Result<TaskId> {
        self.push(name.into(), TaskBody::Leaf(transform))
    }

    pub fn add_series(&mut self, name: impl Into<String>, children: Vec<TaskId>) -> Result<TaskId> {
        self.check_children(&children)?;
        self.push(name.into(), TaskBody::Series(children))
    }

    pub fn add_parallel(&mut self, name: impl Into<String>, children: Vec<TaskId>) -> Result<TaskId> {
        self.check_children(&children)?;
        self.push(name.into(), TaskBody::Parallel(children))
    }

    /// Handle of an already-added node.
    pub fn id_of(&self, name: &str) -> Result<TaskId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| PipelineError::UnknownTask(name.to_string()))
    }

    pub fn freeze(self) -> TaskGraph {
        TaskGraph {
            nodes: self.nodes,
            index: self.index,
        }
    }

    fn check_children(&self, children: &[TaskId]) -> Result<()> {
        if let Some(bad) = children.iter().find(|id| id.0 >= self.nodes.len()) {
            return Err(PipelineError::ConfigError(format!(
                "composite references task #{} which does not exist yet",
                bad.0
            )));
        }
        Ok(())
    }

    fn push(&mut self, name: String, body: TaskBody) -> Result<TaskId> {
        if self.index.contains_key(&name) {
            return Err(PipelineError::ConfigError(format!(
                "task '{name}' is defined more than once"
            )));
        }
        let id = TaskId(self.nodes.len());
        self.index.insert(name.clone(), id);
        self.nodes.push(TaskNode { name, body });
        Ok(id)
    }
}

/// Immutable task graph, built once at startup.
#[derive(Debug)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
    index: HashMap<String, TaskId>,
}

impl TaskGraph {
    /// Resolve a task name; unknown names are configuration errors.
    pub fn resolve(&self, name: &str) -> Result<TaskId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| PipelineError::UnknownTask(name.to_string()))
    }

    pub fn node(&self, id: TaskId) -> &TaskNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Task names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    /// Indented tree rendering of one task, used by `tasks` and `--dry-run`.
    pub fn describe(&self, id: TaskId) -> String {
        let mut out = String::new();
        self.describe_into(id, 0, &mut out);
        out
    }

    fn describe_into(&self, id: TaskId, depth: usize, out: &mut String) {
        let node = self.node(id);
        let indent = "  ".repeat(depth);
        match &node.body {
            TaskBody::Leaf(t) => {
                out.push_str(&format!("{indent}{} ({})\n", node.name, t.describe()));
            }
            TaskBody::Series(children) | TaskBody::Parallel(children) => {
                out.push_str(&format!("{indent}{} [{}]\n", node.name, node.kind()));
                for child in children {
                    self.describe_into(*child, depth + 1, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{TransformContext, TransformFuture, TransformOutput};

    struct Noop;

    impl Transform for Noop {
        fn describe(&self) -> String {
            "noop".into()
        }

        fn run<'a>(&'a self, _ctx: &'a TransformContext) -> TransformFuture<'a> {
            Box::pin(async { Ok(TransformOutput::default()) })
        }
    }

    #[test]
    fn composites_reference_existing_nodes() {
        let mut b = GraphBuilder::new();
        let a = b.add_leaf("a", Arc::new(Noop)).unwrap();
        let c = b.add_leaf("c", Arc::new(Noop)).unwrap();
        let both = b.add_parallel("both", vec![a, c]).unwrap();
        b.add_series("all", vec![a, both]).unwrap();
        let g = b.freeze();

        let all = g.resolve("all").unwrap();
        assert_eq!(g.node(all).kind(), TaskKind::Series);
        assert_eq!(g.node(all).children(), &[a, both]);
        assert_eq!(
            g.describe(all),
            "all [series]\n  a (noop)\n  both [parallel]\n    a (noop)\n    c (noop)\n"
        );
    }

    #[test]
    fn duplicate_and_unknown_names_are_config_errors() {
        let mut b = GraphBuilder::new();
        b.add_leaf("a", Arc::new(Noop)).unwrap();
        assert!(matches!(
            b.add_leaf("a", Arc::new(Noop)),
            Err(PipelineError::ConfigError(_))
        ));
        assert!(matches!(
            b.add_series("s", vec![TaskId(7)]),
            Err(PipelineError::ConfigError(_))
        ));

        let g = b.freeze();
        assert!(matches!(g.resolve("nope"), Err(PipelineError::UnknownTask(n)) if n == "nope"));
    }
}
