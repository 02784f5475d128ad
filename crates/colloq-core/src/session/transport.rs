//! Network transport boundary.
//!
//! The core never talks to the network itself. Collaborators inject a
//! [`ChatTransport`] and the session services call it with a path, a method
//! and an optional JSON body.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fallback cause used when a failure carries no readable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed";

/// HTTP-style request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A rejected request.
///
/// `payload` holds the structured error body when the server sent one;
/// `reason` holds a transport-level description (connection refused, timeout).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransportError {
    pub status: Option<u16>,
    pub payload: Option<Value>,
    pub reason: Option<String>,
}

impl TransportError {
    /// A failure with a structured error body.
    pub fn with_payload(status: Option<u16>, payload: Value) -> Self {
        Self {
            status,
            payload: Some(payload),
            reason: None,
        }
    }

    /// A failure that never produced a response body.
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            status: None,
            payload: None,
            reason: Some(reason.into()),
        }
    }

    /// The user-facing cause of this failure.
    ///
    /// Prefers the payload's message, then the transport reason, then
    /// [`GENERIC_FAILURE_MESSAGE`].
    pub fn message(&self) -> String {
        self.payload
            .as_ref()
            .and_then(extract_error_message)
            .or_else(|| self.reason.clone().filter(|r| !r.trim().is_empty()))
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {})", self.message(), status),
            None => f.write_str(&self.message()),
        }
    }
}

impl std::error::Error for TransportError {}

/// Pulls a readable cause out of an error body.
///
/// Understands `{"detail": "..."}`, validation lists of the form
/// `{"detail": [{"msg": "..."}]}`, and `message` / `error` string fields.
pub fn extract_error_message(payload: &Value) -> Option<String> {
    let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.to_string());

    match payload.get("detail") {
        Some(Value::String(detail)) => {
            if let Some(detail) = non_empty(detail) {
                return Some(detail);
            }
        }
        Some(Value::Array(items)) => {
            if let Some(msg) = items
                .iter()
                .find_map(|item| item.get("msg").and_then(Value::as_str))
                .and_then(non_empty)
            {
                return Some(msg);
            }
        }
        _ => {}
    }

    ["message", "error"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str).and_then(non_empty))
}

/// The injected network capability.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Issues one request and resolves to the decoded JSON payload.
    async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<Value>,
    ) -> Result<Value, TransportError>;
}
