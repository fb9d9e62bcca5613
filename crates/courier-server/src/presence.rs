//! Presence registry — live mapping from user identity to an active connection.

use std::collections::HashMap;
use std::sync::Arc;

use courier_core::{ConnectionId, UserId};
use tokio::sync::RwLock;
use tracing::debug;

use crate::websocket::connection::ClientConnection;

/// Maps each registered user to their live connection.
///
/// At most one entry per user; a re-registration (reconnect, second tab)
/// unconditionally overwrites the previous entry. Entries are removed only by
/// the owning connection's session on close, keyed by connection ID, so a
/// stale socket closing late never evicts a newer registration.
pub struct PresenceRegistry {
    entries: RwLock<HashMap<UserId, Arc<ClientConnection>>>,
}

impl PresenceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register a user's connection. Last write wins.
    pub async fn register(&self, user_id: UserId, connection: Arc<ClientConnection>) {
        let mut entries = self.entries.write().await;
        let previous = entries.insert(user_id.clone(), connection);
        if let Some(prev) = previous {
            debug!(user_id = %user_id, replaced = %prev.id(), "re-registration replaced live connection");
        } else {
            debug!(user_id = %user_id, "user registered");
        }
    }

    /// Current connection for a user, if one is registered.
    pub async fn lookup(&self, user_id: &UserId) -> Option<Arc<ClientConnection>> {
        self.entries.read().await.get(user_id).cloned()
    }

    /// Remove the entry owned by the given connection, if any.
    ///
    /// Scans all entries and removes the first whose connection ID matches.
    /// Covers connections that close without ever registering (no-op) and
    /// guards the stale-socket race: an entry overwritten by a newer
    /// connection no longer matches and is left in place.
    pub async fn unregister_handle(&self, connection_id: &ConnectionId) -> Option<UserId> {
        let mut entries = self.entries.write().await;
        let owned = entries
            .iter()
            .find(|(_, conn)| conn.id() == connection_id)
            .map(|(user, _)| user.clone());
        if let Some(ref user_id) = owned {
            let _ = entries.remove(user_id);
            debug!(user_id = %user_id, connection_id = %connection_id, "user unregistered");
        }
        owned
    }

    /// Point-in-time snapshot of all entries, for broadcast iteration.
    ///
    /// Cloned under the read lock: concurrent registrations or removals
    /// neither tear an entry nor mutate the returned snapshot.
    pub async fn entries(&self) -> Vec<(UserId, Arc<ClientConnection>)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(user, conn)| (user.clone(), conn.clone()))
            .collect()
    }

    /// Number of registered users.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no user is registered.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
