//! Chat message types.
//!
//! This module contains types for representing messages in a chat session,
//! including roles, optional server metadata, and the delivery lifecycle of a
//! locally authored message.

use serde::{Deserialize, Serialize};

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the AI assistant.
    Assistant,
}

/// Server-provided details attached to an assistant reply.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Retrieval sources cited by the reply.
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Server-side processing time in milliseconds.
    #[serde(default, alias = "processing_time")]
    pub processing_time_ms: Option<f64>,
}

/// A single message in a chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: String,
    /// The content of the message.
    pub content: String,
    /// The role of the message sender.
    pub role: MessageRole,
    /// Timestamp when the message was created (ISO 8601 format).
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    /// Drafts a user message with a fresh id and the current time.
    pub fn user(content: impl Into<String>) -> Self {
        Self::drafted(MessageRole::User, content)
    }

    /// Drafts an assistant message with a fresh id and the current time.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::drafted(MessageRole::Assistant, content)
    }

    fn drafted(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            role,
            timestamp: chrono::Utc::now().to_rfc3339(),
            metadata: None,
        }
    }

    /// Attaches server metadata.
    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Server-side processing time, if the server reported one.
    pub fn processing_time_ms(&self) -> Option<f64> {
        self.metadata.as_ref().and_then(|m| m.processing_time_ms)
    }
}

/// Accepts either an ISO 8601 string or epoch seconds (the server echoes
/// replies with a float timestamp) and normalizes to RFC 3339.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => {
            let secs = n
                .as_f64()
                .ok_or_else(|| D::Error::custom("timestamp is not a finite number"))?;
            chrono::DateTime::from_timestamp_millis((secs * 1000.0) as i64)
                .map(|dt| dt.to_rfc3339())
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {secs}")))
        }
        other => Err(D::Error::custom(format!(
            "expected string or number timestamp, got {other}"
        ))),
    }
}

/// Lifecycle of a locally authored message.
///
/// `Drafted` → `Displayed` → `Confirmed` | `Failed`. Confirmation and failure
/// both append a separate message; the optimistic one is never replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeliveryState {
    /// Constructed locally, not yet visible.
    Drafted,
    /// Appended optimistically and visible.
    Displayed,
    /// The server reply has been appended.
    Confirmed,
    /// The request failed and an error placeholder has been appended.
    Failed { error: String },
}

impl DeliveryState {
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drafted_messages_have_unique_ids() {
        let a = Message::user("hi");
        let b = Message::user("hi");
        assert_ne!(a.id, b.id);
        assert_eq!(a.role, MessageRole::User);
        assert!(a.metadata.is_none());
    }

    #[test]
    fn test_deserialize_server_reply() {
        let json = serde_json::json!({
            "id": "ai-1",
            "content": "Hello",
            "role": "assistant",
            "timestamp": "2025-01-01T00:00:00Z",
            "metadata": { "sources": ["doc.pdf"], "processing_time": 120.0 }
        });
        let message: Message = serde_json::from_value(json).unwrap();
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.processing_time_ms(), Some(120.0));
        assert_eq!(message.metadata.unwrap().sources, vec!["doc.pdf"]);
    }

    #[test]
    fn test_numeric_timestamp_is_normalized() {
        let json = serde_json::json!({
            "id": "ai-1700000000",
            "content": "Hi",
            "role": "assistant",
            "timestamp": 1_700_000_000.5
        });
        let message: Message = serde_json::from_value(json).unwrap();
        assert!(message.timestamp.starts_with("2023-11-14T22:13:20.500"));
    }

    #[test]
    fn test_delivery_state_settled() {
        assert!(!DeliveryState::Drafted.is_settled());
        assert!(!DeliveryState::Displayed.is_settled());
        assert!(DeliveryState::Confirmed.is_settled());
        assert!(
            DeliveryState::Failed {
                error: "boom".into()
            }
            .is_settled()
        );
    }
}
