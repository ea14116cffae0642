// src/watch/event_handler.rs

//! Turns filesystem change events into task runs.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, EventKind};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::{Orchestrator, RunResult, TriggerReason};
use crate::server::ReloadHandle;
use crate::watch::bindings::WatchBinding;
use crate::watch::path_utils::relative_str;

/// Dispatches change events to the bindings whose pattern matches.
///
/// Each matching binding runs its task exactly once per event, however many
/// of the event's paths it matches. Runs are spawned, so a slow rebuild never
/// blocks event intake.
#[derive(Debug, Clone)]
pub struct WatchDispatcher {
    root: PathBuf,
    bindings: Arc<Vec<WatchBinding>>,
    orchestrator: Arc<Orchestrator>,
    reload: Option<ReloadHandle>,
    ignored: Option<PathBuf>,
}

impl WatchDispatcher {
    pub fn new(
        root: impl Into<PathBuf>,
        bindings: Vec<WatchBinding>,
        orchestrator: Arc<Orchestrator>,
        reload: Option<ReloadHandle>,
    ) -> Self {
        Self {
            root: root.into(),
            bindings: Arc::new(bindings),
            orchestrator,
            reload,
            ignored: None,
        }
    }

    /// Drop every change under `dir` (relative to the root, or absolute).
    /// Used for the output root, which the dispatched runs write into.
    pub fn ignoring(mut self, dir: impl AsRef<Path>) -> Self {
        self.ignored = Some(self.root.join(dir));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bindings(&self) -> &[WatchBinding] {
        &self.bindings
    }

    /// Handle one notify event. Access-only events are ignored.
    pub fn handle_event(&self, event: &Event) -> Vec<JoinHandle<RunResult>> {
        if matches!(event.kind, EventKind::Access(_)) {
            return Vec::new();
        }
        self.handle_paths(&event.paths)
    }

    /// Spawn one run per binding matching any of `paths`.
    pub fn handle_paths(&self, paths: &[PathBuf]) -> Vec<JoinHandle<RunResult>> {
        let mut matched = BTreeSet::new();
        for path in paths {
            if self.ignored.as_ref().is_some_and(|dir| path.starts_with(dir)) {
                debug!(?path, "ignoring change under output root");
                continue;
            }
            let Some(rel) = relative_str(&self.root, path) else {
                warn!(?path, root = ?self.root, "could not relativize path against root");
                continue;
            };
            for (idx, binding) in self.bindings.iter().enumerate() {
                if binding.matches(&rel) {
                    debug!(rel = %rel, task = %binding.task, "watch pattern matched");
                    matched.insert(idx);
                }
            }
        }

        matched.into_iter().map(|idx| self.spawn_run(idx)).collect()
    }

    fn spawn_run(&self, idx: usize) -> JoinHandle<RunResult> {
        let bindings = Arc::clone(&self.bindings);
        let orchestrator = Arc::clone(&self.orchestrator);
        let reload = self.reload.clone();

        tokio::spawn(async move {
            let binding = &bindings[idx];
            let lock = binding.lock();
            let _guard = lock.lock().await;

            info!(task = %binding.task, "change detected, rebuilding");
            let report = orchestrator.run_id(binding.task_id, TriggerReason::FileWatch).await;
            let result = report.result;

            match &result.error {
                None => {
                    if let (Some(scope), Some(reload)) = (binding.on_complete, reload.as_ref()) {
                        reload.reload(scope);
                    }
                }
                Some(err) => {
                    for leaf in err.leaf_errors() {
                        error!(
                            task = %leaf.task().unwrap_or(&binding.task),
                            error = %leaf,
                            "watched rebuild failed"
                        );
                    }
                }
            }
            result
        })
    }
}
