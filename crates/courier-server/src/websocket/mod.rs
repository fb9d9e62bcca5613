//! WebSocket gateway — connection state, frame parsing, and session lifecycle.

pub mod connection;
pub mod handler;
pub mod session;
