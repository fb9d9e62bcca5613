//! The notification data model, in the wire format clients consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::NotificationId;

/// Read state of a stored notification.
///
/// The only legal transition is `Unread` → `Read`; marking an already-read
/// notification read again is a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Delivered or stored, not yet acknowledged by the user.
    Unread,
    /// Acknowledged via the read-marking operation.
    Read,
}

/// Who a send request is addressed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// A single user, named in the request.
    Specific,
    /// Every user registered at dispatch time.
    Broadcast,
}

/// One notification, as stored in a mailbox and pushed over a connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique, time-ordered identifier minted at dispatch.
    pub id: NotificationId,
    /// Message text.
    pub message: String,
    /// Read state; starts out `Unread`.
    pub status: NotificationStatus,
    /// When the notification was sent (client-supplied or stamped at dispatch).
    pub timestamp: DateTime<Utc>,
    /// Whether this was a specific send or a broadcast.
    pub target: Target,
}

impl Notification {
    /// Mint a new unread notification.
    #[must_use]
    pub fn new(message: impl Into<String>, target: Target, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::new(),
            message: message.into(),
            status: NotificationStatus::Unread,
            timestamp,
            target,
        }
    }

    /// Transition to `Read`. Idempotent.
    pub fn mark_read(&mut self) {
        self.status = NotificationStatus::Read;
    }

    /// Whether the notification has not been read yet.
    #[must_use]
    pub fn is_unread(&self) -> bool {
        self.status == NotificationStatus::Unread
    }
}
