//! Graceful shutdown wiring via `tokio::signal` + `CancellationToken`.

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Wait for SIGINT or SIGTERM, then cancel the token.
///
/// The accept loop uses the token as its graceful-shutdown future; session
/// tasks end on their own when their sockets close.
pub async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }

    cancel.cancel();
}
