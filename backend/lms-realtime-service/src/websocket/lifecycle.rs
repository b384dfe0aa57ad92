/// Per-connection state machine
///
/// `Connected -> Registered(user) -> Disconnected`. Disconnected is terminal:
/// a reconnect is a new transport connection and a new machine.
use thiserror::Error;

use crate::metrics;
use crate::models::{ConnectionId, UserId};
use crate::presence::{ConnectionHandle, PresenceRegistry, Registration};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Registered(UserId),
    Disconnected,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("connection is already closed")]
    Closed,
}

/// Ties one transport connection to the presence registry.
///
/// Closing is idempotent and also happens on drop, so the registry entry is
/// released however the connection ends.
pub struct ConnectionLifecycle {
    handle: ConnectionHandle,
    registry: PresenceRegistry,
    state: ConnectionState,
}

impl ConnectionLifecycle {
    pub fn open(handle: ConnectionHandle, registry: PresenceRegistry) -> Self {
        metrics::connection_opened();
        tracing::debug!(connection_id = %handle.id(), "connection opened");
        Self {
            handle,
            registry,
            state: ConnectionState::Connected,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.handle.id()
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match &self.state {
            ConnectionState::Registered(user_id) => Some(user_id),
            _ => None,
        }
    }

    /// Handle a `register-user` message.
    ///
    /// Registering again under a different user rebinds this connection.
    pub fn register(&mut self, user_id: UserId) -> Result<Registration, LifecycleError> {
        if self.state == ConnectionState::Disconnected {
            return Err(LifecycleError::Closed);
        }

        let report = self.registry.register(user_id.clone(), self.handle.clone());
        if let Some(replaced) = report.replaced {
            tracing::info!(
                user_id = %user_id,
                connection_id = %self.handle.id(),
                replaced = %replaced,
                "user reconnected, previous connection superseded"
            );
        }
        if let Some(previous_user) = &report.previous_user {
            tracing::info!(
                user_id = %user_id,
                previous_user = %previous_user,
                connection_id = %self.handle.id(),
                "connection rebound to another user"
            );
        }

        self.state = ConnectionState::Registered(user_id);
        Ok(report)
    }

    /// Transport closed. Returns the user that went offline, if this
    /// connection was still that user's current one.
    pub fn close(&mut self) -> Option<UserId> {
        if self.state == ConnectionState::Disconnected {
            return None;
        }
        self.state = ConnectionState::Disconnected;
        metrics::connection_closed();

        let removed = self.registry.unregister(self.handle.id());
        tracing::debug!(
            connection_id = %self.handle.id(),
            user_id = ?removed.as_ref().map(UserId::as_str),
            "connection closed"
        );
        removed
    }
}

impl Drop for ConnectionLifecycle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::parse(id).unwrap()
    }

    #[test]
    fn test_open_starts_connected() {
        let (handle, _rx) = ConnectionHandle::channel();
        let conn = ConnectionLifecycle::open(handle, PresenceRegistry::new());
        assert_eq!(conn.state(), &ConnectionState::Connected);
        assert_eq!(conn.user_id(), None);
    }

    #[test]
    fn test_register_moves_to_registered() {
        let registry = PresenceRegistry::new();
        let (handle, _rx) = ConnectionHandle::channel();
        let mut conn = ConnectionLifecycle::open(handle.clone(), registry.clone());

        conn.register(user("u1")).unwrap();

        assert_eq!(conn.state(), &ConnectionState::Registered(user("u1")));
        assert_eq!(registry.lookup(&user("u1")), Some(handle));
    }

    #[test]
    fn test_reregister_rebinds_user() {
        let registry = PresenceRegistry::new();
        let (handle, _rx) = ConnectionHandle::channel();
        let mut conn = ConnectionLifecycle::open(handle.clone(), registry.clone());

        conn.register(user("u1")).unwrap();
        let report = conn.register(user("u2")).unwrap();

        assert_eq!(report.previous_user, Some(user("u1")));
        assert_eq!(conn.user_id(), Some(&user("u2")));
        assert!(registry.lookup(&user("u1")).is_none());
        assert_eq!(registry.lookup(&user("u2")), Some(handle));
    }

    #[test]
    fn test_close_unregisters_and_is_terminal() {
        let registry = PresenceRegistry::new();
        let (handle, _rx) = ConnectionHandle::channel();
        let mut conn = ConnectionLifecycle::open(handle, registry.clone());
        conn.register(user("u1")).unwrap();

        assert_eq!(conn.close(), Some(user("u1")));
        assert_eq!(conn.state(), &ConnectionState::Disconnected);
        assert!(registry.is_empty());

        assert_eq!(conn.close(), None);
        assert_eq!(conn.register(user("u1")), Err(LifecycleError::Closed));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_close_without_register_is_noop() {
        let registry = PresenceRegistry::new();
        let (handle, _rx) = ConnectionHandle::channel();
        let mut conn = ConnectionLifecycle::open(handle, registry.clone());

        assert_eq!(conn.close(), None);
        assert_eq!(conn.state(), &ConnectionState::Disconnected);
    }

    #[test]
    fn test_stale_close_after_reconnect() {
        let registry = PresenceRegistry::new();
        let (h1, _rx1) = ConnectionHandle::channel();
        let (h2, _rx2) = ConnectionHandle::channel();

        let mut first = ConnectionLifecycle::open(h1, registry.clone());
        first.register(user("u1")).unwrap();
        let mut second = ConnectionLifecycle::open(h2.clone(), registry.clone());
        second.register(user("u1")).unwrap();

        assert_eq!(first.close(), None);
        assert_eq!(registry.lookup(&user("u1")), Some(h2));
    }

    #[test]
    fn test_drop_releases_registration() {
        let registry = PresenceRegistry::new();
        let (handle, _rx) = ConnectionHandle::channel();
        {
            let mut conn = ConnectionLifecycle::open(handle, registry.clone());
            conn.register(user("u1")).unwrap();
            assert!(registry.is_online(&user("u1")));
        }
        assert!(!registry.is_online(&user("u1")));
    }
}
