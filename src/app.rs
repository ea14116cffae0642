// src/app.rs

//! The assembled pipeline: config, frozen task graph and orchestrator.

use std::sync::Arc;

use crate::config::ConfigFile;
use crate::dag::{build_task_graph, TaskGraph};
use crate::engine::Orchestrator;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::server::ReloadHandle;
use crate::transform::{BuiltinTransforms, TransformContext, TransformSet};
use crate::watch::{build_bindings, WatchDispatcher};

/// Everything built once at startup and shared by the build, the watcher
/// and the dev server.
#[derive(Debug, Clone)]
pub struct App {
    cfg: Arc<ConfigFile>,
    graph: Arc<TaskGraph>,
    orchestrator: Arc<Orchestrator>,
}

impl App {
    /// Wire the real per-category transforms.
    pub fn new(cfg: ConfigFile, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let cfg = Arc::new(cfg);
        let transforms = BuiltinTransforms::new(Arc::clone(&cfg), fs);
        Self::with_transforms(cfg, &transforms)
    }

    pub fn with_transforms(cfg: Arc<ConfigFile>, transforms: &dyn TransformSet) -> Result<Self> {
        let graph = Arc::new(build_task_graph(&cfg, transforms)?);
        let ctx = TransformContext {
            root: cfg.root().to_path_buf(),
            mode: cfg.mode(),
        };
        let orchestrator =
            Orchestrator::new(Arc::clone(&graph), ctx).with_timeout(cfg.task_timeout());

        Ok(Self {
            cfg,
            graph,
            orchestrator: Arc::new(orchestrator),
        })
    }

    pub fn config(&self) -> &Arc<ConfigFile> {
        &self.cfg
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Dispatcher with one binding per category; `reload` is `None` when no
    /// dev server is running.
    pub fn watch_dispatcher(&self, reload: Option<ReloadHandle>) -> Result<WatchDispatcher> {
        let bindings = build_bindings(&self.cfg, &self.graph)?;
        Ok(WatchDispatcher::new(
            self.cfg.root(),
            bindings,
            Arc::clone(&self.orchestrator),
            reload,
        )
        .ignoring(self.cfg.paths().output_root()))
    }
}
