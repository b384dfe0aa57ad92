/// WebSocket frame types for the realtime channel
///
/// Every text frame is `{"event": <name>, "data": <json>}` in both directions.
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::{ConnectionId, EventPayload, InvalidUserId, UserId};

pub const EVENT_REGISTER_USER: &str = "register-user";
pub const EVENT_PING: &str = "ping";
pub const EVENT_PONG: &str = "pong";
pub const EVENT_CONNECTED: &str = "connected";
pub const EVENT_REGISTERED: &str = "registered";
pub const EVENT_ERROR: &str = "error";

/// Frame pushed from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl ServerFrame {
    /// A fan-out event carrying a domain payload
    pub fn event(name: impl Into<String>, payload: EventPayload) -> Self {
        ServerFrame {
            event: name.into(),
            data: Value::Object(payload),
        }
    }

    pub fn connected(connection_id: ConnectionId) -> Self {
        ServerFrame {
            event: EVENT_CONNECTED.to_string(),
            data: json!({ "connectionId": connection_id }),
        }
    }

    pub fn registered(user_id: &UserId) -> Self {
        ServerFrame {
            event: EVENT_REGISTERED.to_string(),
            data: json!({ "userId": user_id }),
        }
    }

    pub fn pong() -> Self {
        ServerFrame {
            event: EVENT_PONG.to_string(),
            data: json!({ "timestamp": chrono::Utc::now().timestamp_millis() }),
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerFrame {
            event: EVENT_ERROR.to_string(),
            data: json!({ "code": code, "message": message.into() }),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Frame received from a client
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    RegisterUser(UserId),
    Ping,
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    #[error("invalid register-user payload: {0}")]
    InvalidUserId(#[from] InvalidUserId),
}

impl FrameError {
    /// Machine-readable code sent back in the `error` frame
    pub fn code(&self) -> &'static str {
        match self {
            FrameError::Malformed(_) => "MALFORMED_FRAME",
            FrameError::UnknownEvent(_) => "UNKNOWN_EVENT",
            FrameError::InvalidUserId(_) => "INVALID_USER_ID",
        }
    }
}

#[derive(Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

impl ClientFrame {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let raw: RawFrame = serde_json::from_str(text)?;
        match raw.event.as_str() {
            EVENT_REGISTER_USER => Ok(ClientFrame::RegisterUser(UserId::from_json(&raw.data)?)),
            EVENT_PING => Ok(ClientFrame::Ping),
            other => Err(FrameError::UnknownEvent(other.chars().take(64).collect())),
        }
    }
}
