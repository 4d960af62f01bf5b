//! HTTP/WebSocket surface of the development server.
//!
//! Every request goes through one fallback handler:
//! - a WebSocket upgrade at the unit endpoint subscribes to rebuild pushes
//! - any other request is classified by [`RequestRouter`] and resolved

use crate::dev::registry::{UserConnected, WILDCARD_TARGET, channel_push};
use crate::dev::resolver::ResponseDescriptor;
use crate::dev::router::RequestRouter;
use crate::dev::state::SharedState;
use crate::error::{PiletError, Result};
use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Backlog of undelivered metadata documents per connection.
const PUSH_BACKLOG: usize = 16;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<RequestRouter>,
    pub shared: SharedState,
}

/// Development server.
pub struct DevServer {
    addr: SocketAddr,
    state: AppState,
}

impl DevServer {
    pub fn new(addr: SocketAddr, router: Arc<RequestRouter>, shared: SharedState) -> Self {
        Self {
            addr,
            state: AppState { router, shared },
        }
    }

    /// Bind and serve until the task is dropped or the listener fails.
    ///
    /// # Errors
    ///
    /// Returns error if the server cannot bind to the configured address
    pub async fn start(self) -> Result<()> {
        let addr = self.addr;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| PiletError::Server(format!("Failed to bind to {}: {}", addr, e)))?;

        tracing::info!(%addr, "dev server listening");

        axum::serve(listener, build_router(self.state))
            .await
            .map_err(|e| PiletError::Server(format!("Server error: {}", e)))
    }
}

/// Build the axum router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(handle_request)
        .layer(
            // The app shell is usually served from another origin during development.
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn handle_request(
    State(state): State<AppState>,
    upgrade: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    uri: Uri,
) -> Response {
    let raw = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    if let Ok(ws) = upgrade {
        let url = uri.path().trim_start_matches('/').to_string();
        if state.shared.registry.admits(WILDCARD_TARGET, &url) {
            return ws.on_upgrade(move |socket| handle_socket(socket, state.shared, url));
        }
        tracing::debug!(%url, "websocket upgrade outside the unit endpoint");
    }

    let request = state.router.classify(raw);
    match state.router.handle(&request).await {
        Ok(resolution) => resolution.into_descriptor().into_response(),
        Err(e) => {
            tracing::error!(url = %request.url, error = %e, "request failed");
            ResponseDescriptor::text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                .into_response()
        }
    }
}

/// Pump pushed documents into one WebSocket until either side goes away.
async fn handle_socket(socket: WebSocket, shared: SharedState, url: String) {
    let registry = &shared.registry;
    let id = registry.next_id();
    let (tx, mut rx) = tokio::sync::mpsc::channel::<String>(PUSH_BACKLOG);

    let admitted = registry.connect(UserConnected {
        id,
        url,
        target: WILDCARD_TARGET.to_string(),
        push: channel_push(tx),
    });
    if !admitted {
        return;
    }

    let (mut sender, mut receiver) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(document) = rx.recv().await {
            if sender.send(Message::Text(document.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = receiver.next().await {
        if let Message::Close(_) = message {
            break;
        }
    }

    registry.disconnect(id);
    send_task.abort();
}
