//! WebSocket client connection state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use courier_core::{ConnectionId, UserId};
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// One live client connection.
///
/// Holds the send channel to the socket's write task and the user identity
/// bound by a `register` event. The presence registry stores these behind an
/// `Arc`; the session task that created the connection is the only place
/// allowed to remove it from the registry again.
pub struct ClientConnection {
    /// Unique connection ID, minted at upgrade.
    id: ConnectionId,
    /// User bound via `register` (unset until the first register event).
    user_id: Mutex<Option<UserId>>,
    /// Bounded send channel to the connection's WebSocket write task.
    tx: mpsc::Sender<String>,
    /// When this connection was established.
    connected_at: Instant,
    /// Whether the client has responded since the last ping.
    pub is_alive: AtomicBool,
    /// When the last pong (or any liveness signal) was received.
    last_pong: Mutex<Instant>,
    /// Messages dropped because the channel was full or closed.
    dropped: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection around its outbound channel.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<String>) -> Self {
        let now = Instant::now();
        Self {
            id,
            user_id: Mutex::new(None),
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped: AtomicU64::new(0),
        }
    }

    /// The connection's unique ID.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Bind (or rebind) this connection to a user. Last registration wins.
    pub fn bind_user(&self, user_id: UserId) {
        *self.user_id.lock() = Some(user_id);
    }

    /// The currently bound user, if any.
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id.lock().clone()
    }

    /// Push a serialized event to the client.
    ///
    /// Fire-and-forget with a bounded attempt: returns `false` without
    /// blocking when the channel is full or the write task is gone, and
    /// increments the dropped-message counter.
    pub fn send(&self, message: String) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Record a liveness signal (pong received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Duration since the last pong (or connection establishment).
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Check and reset the alive flag.
    ///
    /// Returns `true` if the client signalled liveness since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
