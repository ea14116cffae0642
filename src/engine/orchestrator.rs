// src/engine/orchestrator.rs

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::dag::{TaskBody, TaskGraph, TaskId};
use crate::engine::{RunResult, TaskError, TaskRunState, TriggerReason};
use crate::errors::Result;
use crate::transform::TransformContext;

type NodeFuture<'a> = Pin<Box<dyn Future<Output = RunResult> + Send + 'a>>;

/// Result of one invocation plus the final state of every node it reached.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: u64,
    pub result: RunResult,
    pub states: BTreeMap<String, TaskRunState>,
}

impl RunReport {
    pub fn state_of(&self, task: &str) -> Option<TaskRunState> {
        self.states.get(task).copied()
    }
}

/// Executes named tasks against a frozen graph.
///
/// Holds no per-run state, so one instance can serve overlapping runs
/// (e.g. watch-triggered rebuilds of different categories).
#[derive(Debug)]
pub struct Orchestrator {
    graph: Arc<TaskGraph>,
    ctx: TransformContext,
    timeout: Option<Duration>,
    next_run_id: AtomicU64,
}

impl Orchestrator {
    pub fn new(graph: Arc<TaskGraph>, ctx: TransformContext) -> Self {
        Self {
            graph,
            ctx,
            timeout: None,
            next_run_id: AtomicU64::new(1),
        }
    }

    /// Bound every LEAF transform; `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Resolve `name` and run it. An unknown name fails before any work.
    pub async fn run(&self, name: &str) -> Result<RunReport> {
        let id = self.graph.resolve(name)?;
        Ok(self.run_id(id, TriggerReason::Manual).await)
    }

    pub async fn run_id(&self, id: TaskId, reason: TriggerReason) -> RunReport {
        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let name = self.graph.node(id).name.clone();

        let mut initial = BTreeMap::new();
        self.mark_pending(id, &mut initial);
        let states = Mutex::new(initial);

        info!(task = %name, run_id, reason = %reason, mode = %self.ctx.mode, "starting run");
        let started = Instant::now();
        let result = self.execute(id, &states).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if result.is_success() {
            info!(task = %name, run_id, elapsed_ms, "run succeeded");
        } else {
            warn!(task = %name, run_id, elapsed_ms, "run failed");
        }

        let states = states.into_inner().unwrap_or_else(|e| e.into_inner());
        RunReport {
            run_id,
            result,
            states,
        }
    }

    fn mark_pending(&self, id: TaskId, states: &mut BTreeMap<String, TaskRunState>) {
        let node = self.graph.node(id);
        states.insert(node.name.clone(), TaskRunState::Pending);
        for child in node.children() {
            self.mark_pending(*child, states);
        }
    }

    fn set_state(states: &Mutex<BTreeMap<String, TaskRunState>>, name: &str, state: TaskRunState) {
        let mut guard = states.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(name.to_string(), state);
    }

    fn execute<'a>(
        &'a self,
        id: TaskId,
        states: &'a Mutex<BTreeMap<String, TaskRunState>>,
    ) -> NodeFuture<'a> {
        Box::pin(async move {
            let node = self.graph.node(id);
            let name = node.name.as_str();
            Self::set_state(states, name, TaskRunState::Running);
            debug!(task = %name, kind = %node.kind(), "task running");

            let result = match &node.body {
                TaskBody::Leaf(transform) => {
                    let run = transform.run(&self.ctx);
                    let outcome = match self.timeout {
                        Some(after) => match tokio::time::timeout(after, run).await {
                            Ok(res) => res.map_err(|e| TaskError::Transform {
                                task: name.to_string(),
                                step: e.step,
                                message: e.message,
                            }),
                            Err(_) => Err(TaskError::TimedOut {
                                task: name.to_string(),
                                after,
                            }),
                        },
                        None => run.await.map_err(|e| TaskError::Transform {
                            task: name.to_string(),
                            step: e.step,
                            message: e.message,
                        }),
                    };
                    match outcome {
                        Ok(output) => {
                            debug!(task = %name, files = output.written.len(), "transform finished");
                            RunResult::success(name)
                        }
                        Err(err) => {
                            warn!(task = %name, error = %err, "transform failed");
                            RunResult::failure(name, err)
                        }
                    }
                }
                TaskBody::Series(children) => {
                    let mut result = RunResult::success(name);
                    for child in children {
                        let child_result = self.execute(*child, states).await;
                        if let Some(err) = child_result.error {
                            debug!(task = %name, failed = %child_result.task_name, "series aborted");
                            result = RunResult::failure(name, err);
                            break;
                        }
                    }
                    result
                }
                TaskBody::Parallel(children) => {
                    let results = join_all(children.iter().map(|c| self.execute(*c, states))).await;
                    let errors: Vec<TaskError> = results.into_iter().filter_map(|r| r.error).collect();
                    if errors.is_empty() {
                        RunResult::success(name)
                    } else {
                        RunResult::failure(name, TaskError::Aggregate(errors))
                    }
                }
            };

            let state = if result.is_success() {
                TaskRunState::Succeeded
            } else {
                TaskRunState::Failed
            };
            Self::set_state(states, name, state);
            result
        })
    }
}
