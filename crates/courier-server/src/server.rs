//! `CourierServer` — Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use courier_core::{Notification, NotificationId, UserId};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::dispatch::{Dispatcher, SendRequest};
use crate::health::{self, HealthResponse};
use crate::mailbox::MailboxStore;
use crate::metrics::NOTIFICATIONS_READ_TOTAL;
use crate::presence::PresenceRegistry;
use crate::websocket::session::run_ws_session;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Notification dispatcher.
    pub dispatcher: Arc<Dispatcher>,
    /// Per-user notification history.
    pub mailbox: Arc<MailboxStore>,
    /// Live user → connection mapping.
    pub registry: Arc<PresenceRegistry>,
    /// Server configuration.
    pub config: ServerConfig,
    /// When the server started.
    pub start_time: Instant,
    /// Active WebSocket connection count.
    pub active_connections: Arc<AtomicUsize>,
    /// Handle for rendering `/metrics` (absent when no recorder is installed).
    pub metrics: Option<PrometheusHandle>,
}

/// The courier notification server.
pub struct CourierServer {
    state: AppState,
    cancel: CancellationToken,
}

impl CourierServer {
    /// Create a new server with empty stores.
    pub fn new(config: ServerConfig, metrics: Option<PrometheusHandle>) -> Self {
        let mailbox = Arc::new(MailboxStore::new());
        let registry = Arc::new(PresenceRegistry::new());
        let dispatcher = Arc::new(Dispatcher::new(mailbox.clone(), registry.clone()));
        Self {
            state: AppState {
                dispatcher,
                mailbox,
                registry,
                config,
                start_time: Instant::now(),
                active_connections: Arc::new(AtomicUsize::new(0)),
                metrics,
            },
            cancel: CancellationToken::new(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/notifications/send", post(send_handler))
            .route("/notifications/read", post(read_handler))
            .route("/notifications/{user_id}", get(list_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/ws", get(ws_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind and serve; returns the bound address and the serve task.
    ///
    /// The serve loop drains gracefully when [`Self::shutdown_token`] is
    /// cancelled.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
        let bind = format!("{}:{}", self.state.config.host, self.state.config.port);
        let listener = tokio::net::TcpListener::bind(&bind).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app)
                .with_graceful_shutdown(async move { cancel.cancelled().await });
            if let Err(e) = serve.await {
                error!(error = %e, "server error");
            }
        });
        info!(%addr, "listening");
        Ok((addr, handle))
    }

    /// Token that stops the serve loop when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Get the mailbox store.
    pub fn mailbox(&self) -> &Arc<MailboxStore> {
        &self.state.mailbox
    }

    /// Get the presence registry.
    pub fn registry(&self) -> &Arc<PresenceRegistry> {
        &self.state.registry
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }
}

/// `{message}` body for the always-succeeding endpoints.
#[derive(Debug, Serialize)]
struct MessageBody {
    message: String,
}

/// `{error, message}` body for rejected requests.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

/// POST /notifications/read request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadRequest {
    user_id: UserId,
    notification_ids: Vec<NotificationId>,
}

/// POST /notifications/send
async fn send_handler(
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> Response {
    match state.dispatcher.send(request).await {
        Ok(_) => (
            StatusCode::OK,
            Json(MessageBody {
                message: "Notification sent successfully".into(),
            }),
        )
            .into_response(),
        Err(err) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: err.code().into(),
                message: err.to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /notifications/{userId}
async fn list_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<Vec<Notification>> {
    Json(state.mailbox.list_for(&UserId::from(user_id)).await)
}

/// POST /notifications/read
async fn read_handler(
    State(state): State<AppState>,
    Json(request): Json<ReadRequest>,
) -> Json<MessageBody> {
    let transitioned = state
        .mailbox
        .mark_read(&request.user_id, &request.notification_ids)
        .await;
    counter!(NOTIFICATIONS_READ_TOTAL).increment(transitioned as u64);
    Json(MessageBody {
        message: "Notifications marked as read".into(),
    })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.active_connections.load(Ordering::Relaxed);
    let registered = state.registry.len().await;
    Json(health::health_check(state.start_time, connections, registered))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => crate::metrics::render(handle).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// GET /ws — WebSocket upgrade into a connection session.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    if state.active_connections.load(Ordering::Relaxed) >= state.config.max_connections {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let config = state.config.clone();
    let registry = state.registry.clone();
    let active = state.active_connections.clone();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| run_ws_session(socket, config, registry, active))
}
