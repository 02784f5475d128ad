//! Chat session domain model.
//!
//! This module contains the `ChatSession` entity held by the session cache,
//! together with the helpers that keep its derived fields in sync with its
//! message sequence.

use super::message::Message;
use serde::{Deserialize, Serialize};

/// Represents one chat session as seen by the client.
///
/// `message_count` and `last_preview` are derived from `messages`; mutate the
/// message sequence through [`ChatSession::push_message`] or call
/// [`ChatSession::refresh_derived`] afterwards so they never drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SessionWire")]
pub struct ChatSession {
    /// Unique session identifier
    pub id: String,
    /// Human-readable session title
    pub title: String,
    /// Ordered message sequence, oldest first
    pub messages: Vec<Message>,
    /// Timestamp when the session was created (ISO 8601 format)
    pub created_at: String,
    /// Timestamp when the session was last updated (ISO 8601 format)
    pub updated_at: String,
    pub is_active: bool,
    /// Derived: always equals `messages.len()` once stored
    pub message_count: usize,
    /// Derived: truncated content of the last message
    pub last_preview: String,
    /// Message total the server last listed, which may run ahead of
    /// `messages` until the bodies are fetched
    pub listed_count: usize,
}

/// Server shapes vary: listings send `id` with both `updated_at` and
/// `last_activity`, single-session reads send `session_id`.
#[derive(Deserialize)]
struct SessionWire {
    id: Option<String>,
    session_id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    created_at: String,
    updated_at: Option<String>,
    last_activity: Option<String>,
    #[serde(default)]
    is_active: bool,
    #[serde(default)]
    message_count: usize,
    #[serde(default, alias = "last_message_preview")]
    last_preview: Option<String>,
}

impl TryFrom<SessionWire> for ChatSession {
    type Error = String;

    fn try_from(wire: SessionWire) -> Result<Self, Self::Error> {
        let id = wire
            .id
            .or(wire.session_id)
            .ok_or_else(|| "missing field `id`".to_string())?;
        let listed_count = wire.message_count.max(wire.messages.len());
        Ok(Self {
            id,
            title: wire.title,
            messages: wire.messages,
            created_at: wire.created_at,
            updated_at: wire.updated_at.or(wire.last_activity).unwrap_or_default(),
            is_active: wire.is_active,
            message_count: wire.message_count,
            listed_count,
            last_preview: wire.last_preview.unwrap_or_default(),
        })
    }
}

impl ChatSession {
    /// Creates an empty session stamped with the current time.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            title: title.into(),
            messages: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
            is_active: true,
            message_count: 0,
            last_preview: String::new(),
            listed_count: 0,
        }
    }

    /// Appends a message, bumps `updated_at` and refreshes derived fields.
    pub fn push_message(&mut self, message: Message, preview_length: usize, empty_preview: &str) {
        self.messages.push(message);
        self.updated_at = chrono::Utc::now().to_rfc3339();
        self.refresh_derived(preview_length, empty_preview);
    }

    /// Recomputes `message_count` and `last_preview` from `messages`.
    pub fn refresh_derived(&mut self, preview_length: usize, empty_preview: &str) {
        self.message_count = self.messages.len();
        self.last_preview = preview_of(&self.messages, preview_length, empty_preview);
    }

    /// Best known message total: the messages held, or what the server listed
    /// when their bodies have not been loaded.
    pub fn known_count(&self) -> usize {
        self.messages
            .len()
            .max(self.message_count)
            .max(self.listed_count)
    }

    /// Returns true when the derived fields agree with the message sequence.
    pub fn is_consistent(&self) -> bool {
        self.message_count == self.messages.len()
    }
}

/// Last message content truncated to `preview_length` characters, or
/// `empty_preview` when there are no messages.
pub fn preview_of(messages: &[Message], preview_length: usize, empty_preview: &str) -> String {
    match messages.last() {
        Some(last) => truncate_chars(&last.content, preview_length),
        None => empty_preview.to_string(),
    }
}

fn truncate_chars(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => content[..byte_idx].to_string(),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_message_keeps_count_in_sync() {
        let mut session = ChatSession::new("s1", "First");
        assert_eq!(session.message_count, 0);

        session.push_message(Message::user("hello"), 50, "No messages yet");
        session.push_message(Message::assistant("hi there"), 50, "No messages yet");

        assert_eq!(session.message_count, 2);
        assert_eq!(session.last_preview, "hi there");
        assert!(session.is_consistent());
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(60);
        let preview = preview_of(&[Message::user(long)], 50, "");
        assert_eq!(preview.chars().count(), 50);
    }

    #[test]
    fn test_preview_placeholder_when_empty() {
        assert_eq!(preview_of(&[], 50, "No messages yet"), "No messages yet");
    }

    #[test]
    fn test_deserialize_server_listing_shape() {
        let json = serde_json::json!({
            "session_id": "abc",
            "title": "Chat",
            "created_at": "2025-01-01T00:00:00Z",
            "last_activity": "2025-01-02T00:00:00Z",
            "message_count": 4
        });
        let session: ChatSession = serde_json::from_value(json).unwrap();
        assert_eq!(session.id, "abc");
        assert_eq!(session.updated_at, "2025-01-02T00:00:00Z");
        assert!(session.messages.is_empty());
    }

    #[test]
    fn test_deserialize_listing_with_both_timestamps() {
        let json = serde_json::json!({
            "id": "abc",
            "updated_at": "2025-01-03T00:00:00",
            "last_activity": "2025-01-03T00:00:00",
            "message_count": 2,
            "last_message_preview": null
        });
        let session: ChatSession = serde_json::from_value(json).unwrap();
        assert_eq!(session.updated_at, "2025-01-03T00:00:00");
        assert_eq!(session.message_count, 2);
        assert_eq!(session.listed_count, 2);
        assert_eq!(session.last_preview, "");
    }

    #[test]
    fn test_known_count_survives_refresh_without_bodies() {
        let json = serde_json::json!({ "id": "abc", "message_count": 4 });
        let mut session: ChatSession = serde_json::from_value(json).unwrap();

        session.refresh_derived(50, "No messages yet");

        assert_eq!(session.message_count, 0);
        assert!(session.is_consistent());
        assert_eq!(session.known_count(), 4);
    }

    #[test]
    fn test_deserialize_requires_an_id() {
        let json = serde_json::json!({ "title": "anonymous" });
        assert!(serde_json::from_value::<ChatSession>(json).is_err());
    }
}
