// src/watch/watcher.rs

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::watch::event_handler::WatchDispatcher;

/// Keeps the underlying `RecommendedWatcher` and the dispatch loop alive.
/// Dropping this handle stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    dispatch: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.dispatch.abort();
    }
}

/// Watch the dispatcher's root recursively and forward every event to it.
///
/// Runs in flight when the handle is dropped are abandoned, not drained.
pub fn spawn_watcher(dispatcher: WatchDispatcher) -> Result<WatcherHandle> {
    let root = dispatcher.root().to_path_buf();

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("assetpipe: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("assetpipe: file watch error: {err}");
            }
        },
        Config::default(),
    )
    .context("creating file watcher")?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {:?}", root))?;

    info!(root = ?root, patterns = dispatcher.bindings().len(), "file watcher started");

    let dispatch = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");
            let runs = dispatcher.handle_event(&event);
            if !runs.is_empty() {
                debug!(runs = runs.len(), "spawned watched runs");
            }
        }
        warn!("file watcher channel closed");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        dispatch,
    })
}
