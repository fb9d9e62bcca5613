//! # courier-server
//!
//! Axum HTTP + `WebSocket` server and notification delivery.
//!
//! - HTTP endpoints: send / fetch / mark-read, health check, Prometheus metrics
//! - `WebSocket` gateway: connection lifecycle, register events, heartbeat
//! - Presence registry: live `UserId` → connection mapping (last-write-wins)
//! - Mailbox store: per-user ordered notification history with read state
//! - Dispatcher: store-then-notify routing for specific sends and broadcasts
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod health;
pub mod mailbox;
pub mod metrics;
pub mod presence;
pub mod server;
pub mod shutdown;
pub mod websocket;
