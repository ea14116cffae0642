// src/watch/bindings.rs

use std::sync::Arc;

use globset::{GlobSet, GlobSetBuilder};
use tokio::sync::Mutex;

use crate::config::ConfigFile;
use crate::dag::{TaskGraph, TaskId};
use crate::engine::TaskName;
use crate::errors::{PipelineError, Result};
use crate::transform::asset::build_glob;
use crate::types::{Category, ReloadScope};

/// A watch pattern tied to the task it re-runs.
///
/// Created once at watcher startup. The mutex serialises overlapping runs of
/// the same binding; different bindings never contend.
#[derive(Debug, Clone)]
pub struct WatchBinding {
    pub task: TaskName,
    pub task_id: TaskId,
    pub pattern: String,
    pub on_complete: Option<ReloadScope>,
    matcher: GlobSet,
    lock: Arc<Mutex<()>>,
}

impl WatchBinding {
    pub fn new(
        task: impl Into<TaskName>,
        task_id: TaskId,
        pattern: impl Into<String>,
        on_complete: Option<ReloadScope>,
    ) -> Result<Self> {
        let pattern = pattern.into();
        let glob = build_glob(&pattern).map_err(|e| {
            PipelineError::ConfigError(format!("invalid watch glob '{pattern}': {e}"))
        })?;
        let matcher = GlobSetBuilder::new()
            .add(glob)
            .build()
            .map_err(|e| PipelineError::ConfigError(format!("invalid watch glob '{pattern}': {e}")))?;

        Ok(Self {
            task: task.into(),
            task_id,
            pattern,
            on_complete,
            matcher,
            lock: Arc::new(Mutex::new(())),
        })
    }

    /// `rel` is relative to the project root with forward slashes.
    pub fn matches(&self, rel: &str) -> bool {
        self.matcher.is_match(rel)
    }

    pub(crate) fn lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.lock)
    }
}

/// One binding per category: its watch glob re-runs its producer task.
pub fn build_bindings(cfg: &ConfigFile, graph: &TaskGraph) -> Result<Vec<WatchBinding>> {
    Category::ALL
        .iter()
        .map(|category| {
            let spec = cfg.paths().get(*category)?;
            let task_id = graph.resolve(category.as_str())?;
            WatchBinding::new(
                category.as_str(),
                task_id,
                spec.watch_pattern.clone(),
                cfg.options(*category).reload,
            )
        })
        .collect()
}
