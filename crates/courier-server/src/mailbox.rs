//! Per-user mailboxes — ordered notification history with read state.

use std::collections::HashMap;

use courier_core::{Notification, NotificationId, UserId};
use tokio::sync::RwLock;
use tracing::debug;

/// Stores every user's notification history for the life of the process.
///
/// Mailboxes are created lazily on first append and never destroyed. Growth
/// is unbounded: there is no retention policy, and a restart loses
/// everything. Both are accepted limitations of the delivery contract, not
/// bugs.
pub struct MailboxStore {
    boxes: RwLock<HashMap<UserId, Vec<Notification>>>,
}

impl MailboxStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            boxes: RwLock::new(HashMap::new()),
        }
    }

    /// Append a notification to the tail of a user's mailbox, creating the
    /// mailbox if this is the user's first notification.
    pub async fn append(&self, user_id: &UserId, notification: Notification) {
        let mut boxes = self.boxes.write().await;
        boxes
            .entry(user_id.clone())
            .or_default()
            .push(notification);
    }

    /// The user's full notification history, oldest first.
    ///
    /// Returns an empty vec for unknown users; never creates a mailbox.
    pub async fn list_for(&self, user_id: &UserId) -> Vec<Notification> {
        self.boxes
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Mark the given notifications read in a user's mailbox.
    ///
    /// Permissive batch semantics: ids not present in the mailbox are
    /// silently ignored, an unknown user is a no-op, and re-marking a read
    /// notification changes nothing. Returns how many notifications actually
    /// transitioned.
    pub async fn mark_read(&self, user_id: &UserId, ids: &[NotificationId]) -> usize {
        let mut boxes = self.boxes.write().await;
        let Some(mailbox) = boxes.get_mut(user_id) else {
            return 0;
        };
        let mut transitioned = 0;
        for notification in mailbox.iter_mut() {
            if notification.is_unread() && ids.contains(&notification.id) {
                notification.mark_read();
                transitioned += 1;
            }
        }
        debug!(user_id = %user_id, requested = ids.len(), transitioned, "marked notifications read");
        transitioned
    }

    /// Number of users with a mailbox.
    pub async fn user_count(&self) -> usize {
        self.boxes.read().await.len()
    }
}

impl Default for MailboxStore {
    fn default() -> Self {
        Self::new()
    }
}
