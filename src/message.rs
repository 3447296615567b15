//! Wire protocol definitions
//!
//! JSON messages exchanged with clients, plus the validation step applied
//! to inbound payloads.
//!
//! Client → server: `{"text": "..."}` — nothing else is trusted.
//! Server → client: `{"text", "author", "timestamp"?, "kind"}`. Every
//! delivered message has the same shape so clients need a single render
//! path; the `kind` discriminator tells presence events apart from chat
//! without matching on literal text.

use serde::{Deserialize, Serialize};

/// Literal text carried by join notices
pub const CONNECTED_TEXT: &str = "Connected";

/// Literal text carried by leave notices
pub const DISCONNECTED_TEXT: &str = "Disconnected";

/// Discriminator for delivered messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// User-authored chat message
    Chat,
    /// A connection joined the room
    Joined,
    /// A connection left the room
    Left,
}

/// One chat event as delivered to clients and persisted in the store
///
/// `timestamp` is milliseconds since epoch, assigned by the room actor at
/// receipt time and never trusted from the client. Presence events carry
/// no timestamp and are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    pub kind: MessageKind,
}

impl ChatMessage {
    /// A user-authored message with a server-assigned timestamp
    pub fn chat(text: impl Into<String>, author: impl Into<String>, timestamp: u64) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            timestamp: Some(timestamp),
            kind: MessageKind::Chat,
        }
    }

    /// Join notice for `author`
    pub fn joined(author: impl Into<String>) -> Self {
        Self {
            text: CONNECTED_TEXT.to_string(),
            author: author.into(),
            timestamp: None,
            kind: MessageKind::Joined,
        }
    }

    /// Leave notice for `author`
    pub fn left(author: impl Into<String>) -> Self {
        Self {
            text: DISCONNECTED_TEXT.to_string(),
            author: author.into(),
            timestamp: None,
            kind: MessageKind::Left,
        }
    }
}

/// Raw inbound payload shape
///
/// Extra fields are ignored; a missing or non-string `text` fails
/// deserialization and the payload is rejected.
#[derive(Debug, Deserialize)]
struct RawInbound {
    text: String,
}

/// Validated chat text from a client payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingText {
    pub text: String,
}

/// Outcome of validating one inbound payload
///
/// `Rejected` payloads are silently dropped by the room actor: no error to
/// the client, no broadcast, no storage write.
#[derive(Debug, PartialEq, Eq)]
pub enum ParsedInbound {
    Text(IncomingText),
    Rejected,
}

impl ParsedInbound {
    /// Validate a raw text frame
    ///
    /// Rejects invalid JSON, missing/non-string `text`, text that is blank
    /// after trimming, and text longer than `max_text_len` characters.
    pub fn parse(raw: &str, max_text_len: usize) -> Self {
        let Ok(payload) = serde_json::from_str::<RawInbound>(raw) else {
            return Self::Rejected;
        };
        let text = payload.text.trim();
        if text.is_empty() || text.chars().count() > max_text_len {
            return Self::Rejected;
        }
        Self::Text(IncomingText {
            text: text.to_string(),
        })
    }
}
