/// Real-time presence
///
/// 1. PresenceRegistry: user -> current connection handle
/// 2. EventFanout: targeted and broadcast delivery over the registry
pub mod fanout;
pub mod registry;

pub use fanout::{BroadcastReport, DeliveryOutcome, EventFanout, RealtimeNotifier};
pub use registry::{ConnectionClosed, ConnectionHandle, PresenceRegistry, Registration};
