//! Wire protocol for the chat relay.
//!
//! Every frame is a UTF-8 JSON object tagged by its `type` field. Inbound
//! and outbound messages are separate closed enums; anything that does not
//! match a known inbound tag is rejected at decode time.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Errors produced while decoding an inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Not valid JSON, missing fields, or an unknown `type` tag.
    #[error("invalid frame: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Messages a client may send.
///
/// Extra fields (the browser client also sends `timestamp` and a
/// pre-rendered `content` on join) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Establishes the connection's display name.
    Join { user: String },
    /// Chat text. Any `user` field the client includes is not read.
    Message { content: String },
}

impl ClientMessage {
    /// Decodes a text frame.
    pub fn decode(frame: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(frame)?)
    }
}

/// A chat event as seen by every client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display name, always taken from server-held presence state.
    pub user: String,
    pub content: String,
    /// Server time in epoch milliseconds.
    pub timestamp: i64,
}

impl ChatMessage {
    /// Creates a chat event stamped with the current server time.
    pub fn now(user: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            content: content.into(),
            timestamp: now_millis(),
        }
    }
}

/// The full roster at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    /// Usernames in join order.
    pub users: Vec<String>,
    pub timestamp: i64,
}

impl PresenceSnapshot {
    /// Wraps a roster with the current server time.
    pub fn now(users: Vec<String>) -> Self {
        Self {
            users,
            timestamp: now_millis(),
        }
    }
}

/// Messages the server sends to every registered connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Join(ChatMessage),
    Message(ChatMessage),
    Leave(ChatMessage),
    Users(PresenceSnapshot),
}

impl ServerMessage {
    /// Encodes the message as a single JSON text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Short name of the variant, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::Message(_) => "message",
            Self::Leave(_) => "leave",
            Self::Users(_) => "users",
        }
    }
}

/// Content of the announcement broadcast when `user` joins.
pub fn welcome_text(user: &str) -> String {
    format!("Welcome to the chat, {user}!")
}

/// Content of the announcement broadcast when `user` leaves.
pub fn farewell_text(user: &str) -> String {
    format!("{user} has left the chat.")
}

/// Current server time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_decode_join() {
        let msg = ClientMessage::decode(r#"{"type":"join","user":"alice"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Join {
                user: "alice".to_string()
            }
        );
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        // Shape the browser client actually sends
        let frame = r#"{"type":"message","user":"mallory","content":"hi","timestamp":1}"#;
        let msg = ClientMessage::decode(frame).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Message {
                content: "hi".to_string()
            }
        );
    }

    #[test]
    fn test_decode_rejects_unknown_and_malformed() {
        assert!(ClientMessage::decode(r#"{"type":"leave","user":"a"}"#).is_err());
        assert!(ClientMessage::decode(r#"{"type":"users"}"#).is_err());
        assert!(ClientMessage::decode(r#"{"user":"a"}"#).is_err());
        assert!(ClientMessage::decode(r#"{"type":"message"}"#).is_err());
        assert!(ClientMessage::decode("not json").is_err());
        assert!(ClientMessage::decode("").is_err());
    }

    #[test]
    fn test_encode_chat_shape() {
        let msg = ServerMessage::Message(ChatMessage {
            user: "alice".to_string(),
            content: "hi".to_string(),
            timestamp: 42,
        });
        let value: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "message", "user": "alice", "content": "hi", "timestamp": 42})
        );
    }

    #[test]
    fn test_encode_users_shape() {
        let msg = ServerMessage::Users(PresenceSnapshot {
            users: vec!["alice".to_string(), "bob".to_string()],
            timestamp: 7,
        });
        let value: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "users", "users": ["alice", "bob"], "timestamp": 7})
        );
        assert_eq!(msg.kind(), "users");
    }

    #[test]
    fn test_announcement_text() {
        assert!(welcome_text("bob").contains("bob"));
        assert!(farewell_text("bob").starts_with("bob"));
    }
}
