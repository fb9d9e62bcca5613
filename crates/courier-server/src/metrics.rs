//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at server startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across modules.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// WebSocket connection duration seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Notifications accepted for dispatch (counter, labels: target).
pub const NOTIFICATIONS_SENT_TOTAL: &str = "notifications_sent_total";
/// Notifications pushed to a live connection (counter).
pub const NOTIFICATIONS_DELIVERED_TOTAL: &str = "notifications_delivered_total";
/// Push attempts dropped on a dead or backed-up connection (counter).
pub const NOTIFICATIONS_DROPPED_TOTAL: &str = "notifications_dropped_total";
/// Notifications transitioned to read (counter).
pub const NOTIFICATIONS_READ_TOTAL: &str = "notifications_read_total";
