/// Event fan-out
///
/// Delivers named events to one user or to every registered connection.
/// Delivery is a non-blocking enqueue onto the connection's outbound channel;
/// there is no queueing for offline users and no retry.
use serde::Serialize;

use super::registry::PresenceRegistry;
use crate::metrics;
use crate::models::{EventPayload, LmsEvent, UserId};
use crate::websocket::ServerFrame;

/// Result of a targeted emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOutcome {
    /// Frame queued on the user's current connection
    Delivered,
    /// No live registration for the user
    Offline,
    /// Registration found but the connection closed before the enqueue
    Failed,
}

impl DeliveryOutcome {
    pub fn is_delivered(self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered => "delivered",
            DeliveryOutcome::Offline => "offline",
            DeliveryOutcome::Failed => "failed",
        }
    }
}

/// Counts from one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Capability handed to request handlers for pushing events to users.
///
/// Handlers depend on this trait rather than on the transport, so tests can
/// swap in a recording implementation.
pub trait RealtimeNotifier: Send + Sync {
    /// Push `event` to the user's current connection, if any.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The recipient
    /// * `event` - Event name the client listens for
    /// * `payload` - JSON object carried as the frame's `data`
    fn emit_to_user(&self, user_id: &UserId, event: &str, payload: EventPayload)
        -> DeliveryOutcome;

    /// Push `event` to every connection registered at call time.
    fn emit_broadcast(&self, event: &str, payload: EventPayload) -> BroadcastReport;

    fn is_online(&self, user_id: &UserId) -> bool;

    /// Push a typed LMS event to one user
    fn notify(&self, user_id: &UserId, event: &LmsEvent) -> DeliveryOutcome {
        self.emit_to_user(user_id, event.name(), event.payload())
    }

    /// Push a typed LMS event to everyone online
    fn notify_all(&self, event: &LmsEvent) -> BroadcastReport {
        self.emit_broadcast(event.name(), event.payload())
    }
}

/// `RealtimeNotifier` backed by the presence registry
#[derive(Clone)]
pub struct EventFanout {
    registry: PresenceRegistry,
}

impl EventFanout {
    pub fn new(registry: PresenceRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }
}

impl RealtimeNotifier for EventFanout {
    fn emit_to_user(
        &self,
        user_id: &UserId,
        event: &str,
        payload: EventPayload,
    ) -> DeliveryOutcome {
        let outcome = match self.registry.lookup(user_id) {
            None => {
                tracing::debug!(user_id = %user_id, event, "user offline, event dropped");
                DeliveryOutcome::Offline
            }
            Some(handle) => match handle.deliver(ServerFrame::event(event, payload)) {
                Ok(()) => {
                    tracing::debug!(
                        user_id = %user_id,
                        connection_id = %handle.id(),
                        event,
                        "event delivered"
                    );
                    DeliveryOutcome::Delivered
                }
                Err(e) => {
                    tracing::warn!(user_id = %user_id, event, error = %e, "event delivery failed");
                    DeliveryOutcome::Failed
                }
            },
        };

        metrics::record_event("user", outcome.as_str());
        outcome
    }

    fn emit_broadcast(&self, event: &str, payload: EventPayload) -> BroadcastReport {
        // Sends happen outside the registry lock
        let recipients = self.registry.snapshot();
        let mut report = BroadcastReport {
            attempted: recipients.len(),
            ..BroadcastReport::default()
        };

        for (user_id, handle) in recipients {
            match handle.deliver(ServerFrame::event(event, payload.clone())) {
                Ok(()) => {
                    report.delivered += 1;
                    metrics::record_event("broadcast", "delivered");
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::record_event("broadcast", "failed");
                    tracing::warn!(user_id = %user_id, event, error = %e, "broadcast delivery failed");
                }
            }
        }

        tracing::info!(
            event,
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            "broadcast complete"
        );
        report
    }

    fn is_online(&self, user_id: &UserId) -> bool {
        self.registry.is_online(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::ConnectionHandle;
    use serde_json::json;
    use std::collections::HashSet;

    fn user(id: &str) -> UserId {
        UserId::parse(id).unwrap()
    }

    fn payload(value: serde_json::Value) -> EventPayload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_emit_to_registered_user() {
        let registry = PresenceRegistry::new();
        let fanout = EventFanout::new(registry.clone());
        let (h1, mut rx1) = ConnectionHandle::channel();
        registry.register(user("u1"), h1);

        let outcome = fanout.emit_to_user(&user("u1"), "grade-posted", payload(json!({"score": 9})));

        assert_eq!(outcome, DeliveryOutcome::Delivered);
        let frame = rx1.try_recv().unwrap();
        assert_eq!(frame.event, "grade-posted");
        assert_eq!(frame.data["score"], 9);
    }

    #[test]
    fn test_emit_to_unregistered_user_is_silent() {
        let registry = PresenceRegistry::new();
        let fanout = EventFanout::new(registry.clone());
        let (h1, mut rx1) = ConnectionHandle::channel();
        registry.register(user("u1"), h1);

        let outcome = fanout.emit_to_user(&user("nobody"), "new-message", EventPayload::new());

        assert_eq!(outcome, DeliveryOutcome::Offline);
        assert!(rx1.try_recv().is_err());
    }

    #[test]
    fn test_emit_goes_to_newest_handle_only() {
        let registry = PresenceRegistry::new();
        let fanout = EventFanout::new(registry.clone());
        let (h1, mut rx1) = ConnectionHandle::channel();
        let (h2, mut rx2) = ConnectionHandle::channel();
        registry.register(user("u1"), h1.clone());
        registry.register(user("u1"), h2);
        registry.unregister(h1.id());

        let outcome = fanout.emit_to_user(&user("u1"), "new-announcement", EventPayload::new());

        assert!(outcome.is_delivered());
        assert!(rx1.try_recv().is_err());
        assert_eq!(rx2.try_recv().unwrap().event, "new-announcement");
    }

    #[test]
    fn test_emit_to_closed_connection_is_offline() {
        let registry = PresenceRegistry::new();
        let fanout = EventFanout::new(registry.clone());
        let (h1, rx1) = ConnectionHandle::channel();
        registry.register(user("u1"), h1);
        drop(rx1);

        assert_eq!(
            fanout.emit_to_user(&user("u1"), "grade-posted", EventPayload::new()),
            DeliveryOutcome::Offline
        );
    }

    #[test]
    fn test_broadcast_reaches_exactly_registered_handles() {
        let registry = PresenceRegistry::new();
        let fanout = EventFanout::new(registry.clone());

        let (ha, mut rxa) = ConnectionHandle::channel();
        let (hb, mut rxb) = ConnectionHandle::channel();
        let (_unregistered, mut rx_unregistered) = ConnectionHandle::channel();
        registry.register(user("a"), ha);
        registry.register(user("b"), hb);

        let report = fanout.emit_broadcast("maintenance", payload(json!({"at": "22:00"})));

        assert_eq!(
            report,
            BroadcastReport {
                attempted: 2,
                delivered: 2,
                failed: 0
            }
        );
        let received: HashSet<_> = [rxa.try_recv().unwrap(), rxb.try_recv().unwrap()]
            .into_iter()
            .map(|f| f.event)
            .collect();
        assert_eq!(received, HashSet::from(["maintenance".to_string()]));
        assert!(rx_unregistered.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_continues_past_closed_handle() {
        let registry = PresenceRegistry::new();
        let fanout = EventFanout::new(registry.clone());

        let (ha, rxa) = ConnectionHandle::channel();
        let (hb, mut rxb) = ConnectionHandle::channel();
        registry.register(user("a"), ha);
        registry.register(user("b"), hb);
        drop(rxa);

        let report = fanout.emit_broadcast("ping-all", EventPayload::new());

        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert!(rxb.try_recv().is_ok());
    }

    #[test]
    fn test_broadcast_with_nobody_online() {
        let fanout = EventFanout::new(PresenceRegistry::new());
        assert_eq!(
            fanout.emit_broadcast("anything", EventPayload::new()),
            BroadcastReport::default()
        );
    }

    #[test]
    fn test_notify_uses_event_name_and_payload() {
        let registry = PresenceRegistry::new();
        let fanout = EventFanout::new(registry.clone());
        let (h1, mut rx1) = ConnectionHandle::channel();
        registry.register(user("u1"), h1);

        let event = LmsEvent::EnrollmentUpdated {
            course_id: "c1".to_string(),
            status: "approved".to_string(),
        };
        assert!(fanout.notify(&user("u1"), &event).is_delivered());

        let frame = rx1.try_recv().unwrap();
        assert_eq!(frame.event, "enrollment-updated");
        assert_eq!(frame.data["status"], "approved");
    }
}
