use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub mod events;

pub use events::LmsEvent;

/// Structured event payload: string keys to JSON values
pub type EventPayload = serde_json::Map<String, Value>;

/// Opaque user identifier as sent by clients (typically a document id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidUserId {
    #[error("userId is missing")]
    Missing,

    #[error("userId is empty")]
    Empty,

    #[error("userId exceeds {max} bytes", max = UserId::MAX_LEN)]
    TooLong,

    #[error("userId contains control characters")]
    ControlCharacters,

    #[error("userId must be a string or a number")]
    WrongType,
}

impl UserId {
    pub const MAX_LEN: usize = 128;

    /// Surrounding whitespace is dropped; the rest is kept verbatim.
    pub fn parse(raw: &str) -> Result<Self, InvalidUserId> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidUserId::Empty);
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(InvalidUserId::TooLong);
        }
        if trimmed.chars().any(char::is_control) {
            return Err(InvalidUserId::ControlCharacters);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Accepts the shapes clients actually send for a register message:
    /// a string id or a numeric id.
    pub fn from_json(value: &Value) -> Result<Self, InvalidUserId> {
        match value {
            Value::Null => Err(InvalidUserId::Missing),
            Value::String(s) => Self::parse(s),
            Value::Number(n) => Self::parse(&n.to_string()),
            _ => Err(InvalidUserId::WrongType),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = InvalidUserId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one transport connection, allocated when the socket opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Validated event name: 1..=64 chars of `[A-Za-z0-9_.:-]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventName(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event name must be 1-{max} characters of letters, digits, '_', '.', ':' or '-'", max = EventName::MAX_LEN)]
pub struct InvalidEventName;

impl EventName {
    pub const MAX_LEN: usize = 64;

    pub fn parse(raw: &str) -> Result<Self, InvalidEventName> {
        let valid = !raw.is_empty()
            && raw.len() <= Self::MAX_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-'));
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidEventName)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EventName {
    type Error = InvalidEventName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EventName> for String {
    fn from(name: EventName) -> Self {
        name.0
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_id_trims_whitespace() {
        let id = UserId::parse("  64f1c2ab  ").unwrap();
        assert_eq!(id.as_str(), "64f1c2ab");
    }

    #[test]
    fn test_user_id_rejects_empty() {
        assert_eq!(UserId::parse("   "), Err(InvalidUserId::Empty));
    }

    #[test]
    fn test_user_id_rejects_oversized() {
        let raw = "a".repeat(UserId::MAX_LEN + 1);
        assert_eq!(UserId::parse(&raw), Err(InvalidUserId::TooLong));
    }

    #[test]
    fn test_user_id_rejects_control_characters() {
        assert_eq!(
            UserId::parse("user\u{0}1"),
            Err(InvalidUserId::ControlCharacters)
        );
    }

    #[test]
    fn test_user_id_from_json_shapes() {
        assert_eq!(UserId::from_json(&json!("u1")).unwrap().as_str(), "u1");
        assert_eq!(UserId::from_json(&json!(42)).unwrap().as_str(), "42");
        assert_eq!(UserId::from_json(&Value::Null), Err(InvalidUserId::Missing));
        assert_eq!(
            UserId::from_json(&json!({"id": "u1"})),
            Err(InvalidUserId::WrongType)
        );
    }

    #[test]
    fn test_user_id_deserialize_validates() {
        assert!(serde_json::from_str::<UserId>("\"u1\"").is_ok());
        assert!(serde_json::from_str::<UserId>("\"\"").is_err());
    }

    #[test]
    fn test_event_name_rules() {
        assert!(EventName::parse("grade-posted").is_ok());
        assert!(EventName::parse("course:42.updated_v2").is_ok());
        assert!(EventName::parse("").is_err());
        assert!(EventName::parse("has space").is_err());
        assert!(EventName::parse(&"e".repeat(EventName::MAX_LEN + 1)).is_err());
    }

    #[test]
    fn test_connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }
}
