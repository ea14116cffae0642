// src/server/routes.rs

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::stream::Stream;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::server::ReloadHandle;
use crate::types::{Category, ReloadScope};

pub const EVENTS_PATH: &str = "/__assetpipe/events";
pub const CLIENT_PATH: &str = "/__assetpipe/client.js";

const CLIENT_JS: &str = include_str!("client.js");

#[derive(Debug, Clone)]
struct ServerState {
    reload: ReloadHandle,
}

/// Static file server for the output root with a live-reload channel.
#[derive(Debug, Clone)]
pub struct DevServer {
    cfg: Arc<ConfigFile>,
    reload: ReloadHandle,
}

impl DevServer {
    pub fn new(cfg: Arc<ConfigFile>, reload: ReloadHandle) -> Self {
        Self { cfg, reload }
    }

    pub fn reload_handle(&self) -> ReloadHandle {
        self.reload.clone()
    }

    /// Routes: the event stream, the client script, then files from the
    /// output root, falling back to the markup directory so pages resolve
    /// at `/`.
    pub fn router(&self) -> crate::errors::Result<Router> {
        let markup_dir = self.cfg.root().join(&self.cfg.paths().get(Category::Html)?.dest_dir);
        let files = ServeDir::new(self.cfg.output_root()).fallback(ServeDir::new(markup_dir));

        let state = Arc::new(ServerState {
            reload: self.reload.clone(),
        });

        Ok(Router::new()
            .route(EVENTS_PATH, get(events))
            .route(CLIENT_PATH, get(client_js))
            .fallback_service(files)
            .layer(TraceLayer::new_for_http())
            .with_state(state))
    }

    /// Bind the configured address; `port` overrides `[server].port`.
    pub async fn bind(&self, port: Option<u16>) -> Result<TcpListener> {
        let server = self.cfg.server();
        let addr = format!("{}:{}", server.host, port.unwrap_or(server.port));
        TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding dev server to {addr}"))
    }

    /// Serve until the process exits.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let router = self.router()?;
        let addr: SocketAddr = listener.local_addr().context("reading dev server address")?;
        info!(%addr, root = %self.cfg.output_root().display(), "dev server listening");
        axum::serve(listener, router)
            .await
            .context("dev server stopped")
    }
}

async fn client_js() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], CLIENT_JS)
}

async fn events(
    State(state): State<Arc<ServerState>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let mut rx = state.reload.subscribe();
    debug!("reload client connected");

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(scope) => {
                    yield Ok(Event::default().event(scope.event_name()).data(scope.event_name()));
                }
                // Missed signals collapse into one full reload.
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "reload client lagged");
                    let scope = ReloadScope::FullPage;
                    yield Ok(Event::default().event(scope.event_name()).data(scope.event_name()));
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
