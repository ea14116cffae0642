// src/server/mod.rs

//! Development server.
//!
//! Serves the output root over HTTP and pushes reload notifications to
//! connected browsers over server-sent events. Watch-triggered rebuilds send
//! a [`ReloadScope`] through a [`ReloadHandle`]; every open event stream
//! receives it.

pub mod routes;

use tokio::sync::broadcast;
use tracing::debug;

use crate::types::ReloadScope;

pub use routes::{DevServer, CLIENT_PATH, EVENTS_PATH};

const RELOAD_CHANNEL_CAPACITY: usize = 64;

/// Sending side of the reload channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    tx: broadcast::Sender<ReloadScope>,
}

impl Default for ReloadHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadHandle {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(RELOAD_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Notify every connected client. Returns how many were listening.
    pub fn reload(&self, scope: ReloadScope) -> usize {
        match self.tx.send(scope) {
            Ok(n) => {
                debug!(scope = scope.event_name(), clients = n, "reload signal sent");
                n
            }
            Err(_) => {
                debug!(scope = scope.event_name(), "reload signal dropped, no clients");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadScope> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_scope() {
        let handle = ReloadHandle::new();
        assert_eq!(handle.reload(ReloadScope::FullPage), 0);

        let mut rx = handle.subscribe();
        assert_eq!(handle.reload(ReloadScope::InjectCss), 1);
        assert_eq!(rx.recv().await.unwrap(), ReloadScope::InjectCss);
    }
}
