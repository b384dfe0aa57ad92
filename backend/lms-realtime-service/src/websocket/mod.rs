/// WebSocket transport for the realtime channel
///
/// 1. messages: JSON frame types in both directions
/// 2. lifecycle: per-connection state machine bound to the presence registry
/// 3. session: actix actor driving one socket
pub mod lifecycle;
pub mod messages;
pub mod session;

pub use lifecycle::{ConnectionLifecycle, ConnectionState, LifecycleError};
pub use messages::{ClientFrame, FrameError, ServerFrame};
pub use session::{HeartbeatConfig, WsSession, MAX_FRAME_SIZE};
