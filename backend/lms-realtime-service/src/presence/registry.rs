/// Presence registry
///
/// Maps each user to the one connection currently allowed to receive that
/// user's events. A forward map (user -> handle) and a reverse index
/// (connection -> user) are kept as exact inverses under a single lock, so a
/// disconnect is O(1) and can only ever remove the handle that closed.
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::metrics;
use crate::models::{ConnectionId, UserId};
use crate::websocket::ServerFrame;

/// The frame could not be queued: the connection's receiver is gone.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("connection {0} is closed")]
pub struct ConnectionClosed(pub ConnectionId);

/// Reference to a live connection's outbound queue.
///
/// Equality and hashing use the connection id only.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: UnboundedSender<ServerFrame>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, sender: UnboundedSender<ServerFrame>) -> Self {
        Self { id, sender }
    }

    /// Fresh handle plus the receiving end the connection drains.
    pub fn channel() -> (Self, UnboundedReceiver<ServerFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(ConnectionId::new(), tx), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Non-blocking enqueue.
    pub fn deliver(&self, frame: ServerFrame) -> Result<(), ConnectionClosed> {
        self.sender.send(frame).map_err(|_| ConnectionClosed(self.id))
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

impl Hash for ConnectionHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// What a `register` call changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    /// Same (user, handle) pair was already registered
    pub refreshed: bool,
    /// Older handle of this user that was superseded
    pub replaced: Option<ConnectionId>,
    /// User this handle was bound to before rebinding
    pub previous_user: Option<UserId>,
}

#[derive(Default)]
struct Inner {
    by_user: HashMap<UserId, ConnectionHandle>,
    by_connection: HashMap<ConnectionId, UserId>,
}

impl Inner {
    fn publish_gauge(&self) {
        metrics::set_registered_users(self.by_user.len());
    }
}

/// Thread-safe presence registry. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct PresenceRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `user_id` to `handle`, replacing any previous handle for the user.
    ///
    /// If `handle` was bound to a different user, that user's mapping is
    /// dropped. The superseded handle loses its reverse entry, so its later
    /// disconnect cannot evict this registration.
    pub fn register(&self, user_id: UserId, handle: ConnectionHandle) -> Registration {
        let mut inner = self.inner.write();
        let mut report = Registration::default();
        let connection_id = handle.id();

        if let Some(bound_user) = inner.by_connection.get(&connection_id).cloned() {
            if bound_user == user_id {
                report.refreshed = true;
                return report;
            }
            if inner
                .by_user
                .get(&bound_user)
                .is_some_and(|h| h.id() == connection_id)
            {
                inner.by_user.remove(&bound_user);
            }
            report.previous_user = Some(bound_user);
        }

        if let Some(previous) = inner.by_user.insert(user_id.clone(), handle) {
            let previous_id = previous.id();
            if previous_id != connection_id {
                if inner.by_connection.get(&previous_id) == Some(&user_id) {
                    inner.by_connection.remove(&previous_id);
                }
                report.replaced = Some(previous_id);
            }
        }
        inner.by_connection.insert(connection_id, user_id);
        inner.publish_gauge();

        report
    }

    /// Remove the registration owned by `connection_id`.
    ///
    /// Returns the user that went offline, or `None` when the connection was
    /// never registered or has already been superseded.
    pub fn unregister(&self, connection_id: ConnectionId) -> Option<UserId> {
        let mut inner = self.inner.write();
        let user_id = inner.by_connection.remove(&connection_id)?;

        let owned = inner
            .by_user
            .get(&user_id)
            .is_some_and(|h| h.id() == connection_id);
        if !owned {
            return None;
        }

        inner.by_user.remove(&user_id);
        inner.publish_gauge();
        Some(user_id)
    }

    /// Current live handle for `user_id`. Handles whose connection has
    /// already gone away are treated as absent.
    pub fn lookup(&self, user_id: &UserId) -> Option<ConnectionHandle> {
        let inner = self.inner.read();
        inner
            .by_user
            .get(user_id)
            .filter(|h| !h.is_closed())
            .cloned()
    }

    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.lookup(user_id).is_some()
    }

    /// User currently bound to `connection_id`, if any
    pub fn user_for(&self, connection_id: ConnectionId) -> Option<UserId> {
        self.inner.read().by_connection.get(&connection_id).cloned()
    }

    /// Every registered (user, handle) pair at the time of the call,
    /// including handles that have closed but not yet unregistered. Fan-out
    /// uses this so such recipients are reported as failed.
    pub fn snapshot(&self) -> Vec<(UserId, ConnectionHandle)> {
        let inner = self.inner.read();
        inner
            .by_user
            .iter()
            .map(|(user, handle)| (user.clone(), handle.clone()))
            .collect()
    }

    /// Users `is_online` would report as online
    pub fn registered_users(&self) -> Vec<UserId> {
        self.inner
            .read()
            .by_user
            .iter()
            .filter(|(_, h)| !h.is_closed())
            .map(|(user, _)| user.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .by_user
            .values()
            .filter(|h| !h.is_closed())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
