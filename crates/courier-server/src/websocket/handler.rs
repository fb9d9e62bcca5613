//! Incoming WebSocket frame parsing.

use courier_core::UserId;
use serde::Deserialize;

/// A client-originated event on the WebSocket channel.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientEvent {
    /// Bind this connection to a user identity.
    #[serde(rename_all = "camelCase")]
    Register {
        /// The user to bind.
        user_id: UserId,
    },
}

/// Parse a text frame into a client event.
///
/// The channel is push-oriented: `register` is the only meaningful inbound
/// event, so unknown types and garbled frames come back as `None` and the
/// session ignores them rather than answering with an error.
pub fn parse_client_event(message: &str) -> Option<ClientEvent> {
    serde_json::from_str(message).ok()
}
