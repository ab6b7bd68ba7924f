//! Webhook HTTP server.
//!
//! One path serves both webhook calls:
//!
//! ```text
//! 0.0.0.0:3000
//! ├── GET  /webhook  → WebhookHandler::verify   (200 challenge | 403)
//! ├── POST /webhook  → WebhookHandler::receive  (200 | 400 | 404)
//! └── *              → 404
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use chirp_core::{BoxedWebhookHandler, WebhookOutcome};

use crate::error::{TransportError, TransportResult};

/// Default webhook path.
pub const DEFAULT_WEBHOOK_PATH: &str = "/webhook";

/// Builds the router serving `handler` at `path`.
pub fn router(handler: BoxedWebhookHandler, path: &str) -> Router {
    let path = normalize_path(path);
    Router::new()
        .route(&path, get(verify).post(receive))
        .fallback(not_found)
        .with_state(handler)
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

async fn verify(
    State(handler): State<BoxedWebhookHandler>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    match handler.verify(&query) {
        Some(challenge) => (StatusCode::OK, challenge).into_response(),
        None => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
    }
}

async fn receive(State(handler): State<BoxedWebhookHandler>, body: Bytes) -> Response {
    trace!(len = body.len(), "Received webhook POST");
    match handler.receive(&body).await {
        WebhookOutcome::Accepted => (StatusCode::OK, "OK").into_response(),
        WebhookOutcome::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        WebhookOutcome::BadRequest => (StatusCode::BAD_REQUEST, "Bad Request").into_response(),
    }
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// A webhook server bound to an address, ready to serve.
pub struct WebhookServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Router,
    path: String,
}

impl WebhookServer {
    /// Binds `addr` and prepares to serve `handler` at `path`.
    pub async fn bind(
        addr: &str,
        path: &str,
        handler: BoxedWebhookHandler,
    ) -> TransportResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        let path = normalize_path(path);

        Ok(Self {
            listener,
            local_addr,
            router: router(handler, &path),
            path,
        })
    }

    /// Returns the address the OS actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Serves until `shutdown` is cancelled, then finishes in-flight requests.
    pub async fn serve(self, shutdown: CancellationToken) -> TransportResult<()> {
        info!(addr = %self.local_addr, path = %self.path, "Webhook server listening");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;
        info!(addr = %self.local_addr, "Webhook server stopped");
        Ok(())
    }

    /// Serves on a background task.
    pub fn spawn(self) -> ServerHandle {
        let local_addr = self.local_addr;
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let task = tokio::spawn(async move {
            let result = self.serve(token).await;
            if let Err(e) = &result {
                error!(error = %e, "Webhook server error");
            }
            result
        });

        ServerHandle {
            local_addr,
            shutdown,
            task,
        }
    }
}

impl std::fmt::Debug for WebhookServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookServer")
            .field("local_addr", &self.local_addr)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Handle to a server running on a background task.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<TransportResult<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns a token that stops the server when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stops accepting connections and waits for in-flight requests.
    pub async fn shutdown(self) -> TransportResult<()> {
        debug!(addr = %self.local_addr, "Shutting down webhook server");
        self.shutdown.cancel();
        self.wait().await
    }

    /// Waits for the server task to end.
    pub async fn wait(self) -> TransportResult<()> {
        self.task
            .await
            .map_err(|e| TransportError::Task(e.to_string()))?
    }
}
