// src/engine/mod.rs

//! Task execution engine.
//!
//! [`Orchestrator`] walks a frozen [`crate::dag::TaskGraph`] recursively:
//! LEAF nodes run their transform, SERIES nodes stop at the first failed
//! child, PARALLEL nodes run every child concurrently and join on all of
//! them. Task failures are returned as [`RunResult`] values; only
//! configuration problems (an unknown task name) are errors.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub mod orchestrator;

pub use orchestrator::{Orchestrator, RunReport};

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Why a task was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Requested from the command line.
    Manual,
    /// Triggered by a filesystem event.
    FileWatch,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerReason::Manual => f.write_str("manual"),
            TriggerReason::FileWatch => f.write_str("file-watch"),
        }
    }
}

/// Per-invocation state of one task node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failure,
}

/// Why a task run failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// A transform sub-step failed.
    #[error("{step}: {message}")]
    Transform {
        task: TaskName,
        step: String,
        message: String,
    },

    /// One or more PARALLEL children failed; every failure is kept.
    #[error("{} parallel task(s) failed", .0.len())]
    Aggregate(Vec<TaskError>),

    #[error("timed out after {after:?}")]
    TimedOut { task: TaskName, after: Duration },
}

impl TaskError {
    /// Leaf-level failures with aggregates flattened, in child order.
    pub fn leaf_errors(&self) -> Vec<&TaskError> {
        match self {
            TaskError::Aggregate(errors) => errors.iter().flat_map(|e| e.leaf_errors()).collect(),
            other => vec![other],
        }
    }

    /// Name of the leaf task that failed (`None` for aggregates).
    pub fn task(&self) -> Option<&str> {
        match self {
            TaskError::Transform { task, .. } | TaskError::TimedOut { task, .. } => Some(task),
            TaskError::Aggregate(_) => None,
        }
    }
}

/// Outcome of running one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub task_name: TaskName,
    pub status: RunStatus,
    pub error: Option<TaskError>,
}

impl RunResult {
    pub fn success(task_name: impl Into<TaskName>) -> Self {
        Self {
            task_name: task_name.into(),
            status: RunStatus::Success,
            error: None,
        }
    }

    pub fn failure(task_name: impl Into<TaskName>, error: TaskError) -> Self {
        Self {
            task_name: task_name.into(),
            status: RunStatus::Failure,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}
