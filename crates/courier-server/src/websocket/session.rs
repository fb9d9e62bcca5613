//! WebSocket session lifecycle — one connected client from upgrade through
//! disconnect.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use courier_core::ConnectionId;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::config::ServerConfig;
use crate::metrics::{
    WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_CONNECTION_DURATION_SECONDS,
    WS_DISCONNECTIONS_TOTAL,
};
use crate::presence::PresenceRegistry;

use super::connection::ClientConnection;
use super::handler::{ClientEvent, parse_client_event};

/// Run a WebSocket session for a connected client.
///
/// 1. Sends a `connection.established` event with the connection ID
/// 2. Binds the connection into the presence registry on `register` events
///    (re-registering rebinds; the last registration wins)
/// 3. Forwards pushed notifications via the send channel
/// 4. Sends periodic Ping frames and disconnects unresponsive clients
/// 5. On close, removes only its own registry entry
#[instrument(skip_all, fields(connection_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    config: ServerConfig,
    registry: Arc<PresenceRegistry>,
    active: Arc<AtomicUsize>,
) {
    let connection_id = ConnectionId::new();
    let _ = tracing::Span::current().record("connection_id", connection_id.as_str());

    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<String>(config.channel_capacity);
    let connection = Arc::new(ClientConnection::new(connection_id.clone(), send_tx));

    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
    let _ = active.fetch_add(1, Ordering::Relaxed);

    // Hello event so the client learns its connection ID
    let hello = serde_json::json!({
        "type": "connection.established",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "data": {
            "connectionId": connection_id,
        },
    });
    if let Ok(json) = serde_json::to_string(&hello) {
        let _ = ws_tx.send(Message::Text(json.into())).await;
    }

    let ping_interval = Duration::from_secs(config.heartbeat_interval_secs.max(1));
    let pong_timeout = Duration::from_secs(config.heartbeat_timeout_secs.max(1));

    // Spawn the outbound forwarder with periodic Ping frames.
    let outbound_conn = connection.clone();
    let outbound = tokio::spawn(async move {
        let mut ping = tokio::time::interval(ping_interval);
        // Skip the immediate first tick
        let _ = ping.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    match msg {
                        Some(text) => {
                            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.last_pong_elapsed() > pong_timeout
                    {
                        warn!("client unresponsive for {pong_timeout:?}, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Process incoming frames
    while let Some(Ok(msg)) = ws_rx.next().await {
        let text = match msg {
            Message::Text(ref t) => Some(t.to_string()),
            Message::Binary(ref data) => {
                // Some clients send JSON over binary frames
                if let Ok(s) = std::str::from_utf8(data) {
                    Some(s.to_string())
                } else {
                    debug!(len = data.len(), "received non-UTF8 binary frame");
                    None
                }
            }
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                connection.mark_alive();
                None
            }
        };

        let Some(text) = text else { continue };

        match parse_client_event(&text) {
            Some(ClientEvent::Register { user_id }) => {
                info!(user_id = %user_id, "register event");
                connection.bind_user(user_id.clone());
                registry.register(user_id, connection.clone()).await;
            }
            None => {
                debug!("ignoring unrecognized frame");
            }
        }
    }

    // Clean up. Removal is keyed by our connection ID, so a newer
    // registration under another connection survives this close.
    info!(dropped = connection.drop_count(), "client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    let _ = active.fetch_sub(1, Ordering::Relaxed);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());
    outbound.abort();
    let _ = registry.unregister_handle(connection.id()).await;
}
