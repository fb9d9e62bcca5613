//! Notification dispatch — routing, storage ordering, and fan-out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use courier_core::{DispatchError, Notification, Target, UserId};
use metrics::counter;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::mailbox::MailboxStore;
use crate::metrics::{
    NOTIFICATIONS_DELIVERED_TOTAL, NOTIFICATIONS_DROPPED_TOTAL, NOTIFICATIONS_SENT_TOTAL,
};
use crate::presence::PresenceRegistry;
use crate::websocket::connection::ClientConnection;

/// A request to send one notification, as posted to `/notifications/send`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    /// Specific user or broadcast.
    pub target: Target,
    /// Recipient; required when `target` is specific, ignored for broadcast.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Message text.
    pub message: String,
    /// Client-supplied send time; stamped at dispatch when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Routes send requests to mailboxes and live connections.
///
/// Storage always happens before delivery: a notification observed on the
/// wire is already in its recipient's mailbox. Delivery itself is
/// best-effort; a failed push is logged and counted, never retried, and
/// never unwinds the stored copy.
pub struct Dispatcher {
    mailbox: Arc<MailboxStore>,
    registry: Arc<PresenceRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher over the shared stores.
    pub fn new(mailbox: Arc<MailboxStore>, registry: Arc<PresenceRegistry>) -> Self {
        Self { mailbox, registry }
    }

    /// Dispatch one send request.
    ///
    /// Validates the request, mints the notification, then routes:
    ///
    /// - specific: append to the recipient's mailbox, push if they have a
    ///   live connection. An offline recipient is not an error.
    /// - broadcast: for every user registered at this moment, append to
    ///   their mailbox and push over their connection. Users never
    ///   registered get no stored copy.
    pub async fn send(&self, request: SendRequest) -> Result<Notification, DispatchError> {
        let user_id = match request.target {
            Target::Specific => Some(request.user_id.ok_or_else(|| {
                DispatchError::invalid_request("target \"specific\" requires a userId")
            })?),
            Target::Broadcast => None,
        };

        let timestamp = request.timestamp.unwrap_or_else(Utc::now);
        let notification = Notification::new(request.message, request.target, timestamp);
        let target_label = match request.target {
            Target::Specific => "specific",
            Target::Broadcast => "broadcast",
        };
        counter!(NOTIFICATIONS_SENT_TOTAL, "target" => target_label).increment(1);

        // Storage never depends on the wire encoding succeeding.
        let json = encode_event(&notification);

        match user_id {
            Some(user_id) => {
                self.mailbox.append(&user_id, notification.clone()).await;
                match self.registry.lookup(&user_id).await {
                    Some(connection) => {
                        if let Some(json) = json {
                            let _ = push_to(&connection, json);
                        }
                    }
                    None => {
                        debug!(user_id = %user_id, id = %notification.id, "user offline, notification stored");
                    }
                }
            }
            None => {
                let recipients = self.registry.entries().await;
                debug!(
                    recipients = recipients.len(),
                    id = %notification.id,
                    "broadcasting notification"
                );
                for (user_id, connection) in recipients {
                    self.mailbox.append(&user_id, notification.clone()).await;
                    if let Some(ref json) = json {
                        let _ = push_to(&connection, json.clone());
                    }
                }
            }
        }

        Ok(notification)
    }
}

/// Serialize the `notification` push event envelope.
fn encode_event(notification: &Notification) -> Option<String> {
    let event = serde_json::json!({
        "type": "notification",
        "timestamp": Utc::now().to_rfc3339(),
        "data": notification,
    });
    match serde_json::to_string(&event) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(id = %notification.id, error = %e, "failed to serialize notification event");
            None
        }
    }
}

/// Best-effort push to one connection.
fn push_to(connection: &ClientConnection, json: String) -> bool {
    if connection.send(json) {
        counter!(NOTIFICATIONS_DELIVERED_TOTAL).increment(1);
        true
    } else {
        counter!(NOTIFICATIONS_DROPPED_TOTAL).increment(1);
        warn!(connection_id = %connection.id(), "failed to push notification (connection dead or backed up)");
        false
    }
}
