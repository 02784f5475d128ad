//! Chat use case implementation.
//!
//! This module provides the `ChatService` which coordinates the injected
//! `ChatTransport`, the `SessionStore` and the `TelemetryAgent`: every network
//! call is timed, fetched data is reconciled into the store, and sent messages
//! are shown optimistically before the server answers.

use crate::session::SessionStore;
use colloq_core::error::{ColloqError, Result};
use colloq_core::session::{
    ChatSession, ChatTransport, DeliveryState, Message, Method, TransportError,
};
use colloq_core::telemetry::{Details, MetricCategory};
use colloq_telemetry::TelemetryAgent;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

const SESSIONS_PATH: &str = "/chat/sessions";

/// Outcome of [`ChatService::send_message`].
///
/// `local` is the optimistic message as it was displayed. `reply` is the
/// server's answer on success, or the error placeholder on failure.
#[derive(Debug, Clone, Serialize)]
pub struct SendReceipt {
    pub local: Message,
    pub reply: Message,
    pub state: DeliveryState,
}

/// Use case for the chat screen.
///
/// # Thread Safety
///
/// All collaborators are shared through `Arc`; the service itself holds no
/// mutable state and can be cloned freely.
#[derive(Clone)]
pub struct ChatService {
    transport: Arc<dyn ChatTransport>,
    store: Arc<SessionStore>,
    telemetry: Arc<TelemetryAgent>,
}

impl ChatService {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        store: Arc<SessionStore>,
        telemetry: Arc<TelemetryAgent>,
    ) -> Self {
        Self {
            transport,
            store,
            telemetry,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn telemetry(&self) -> &Arc<TelemetryAgent> {
        &self.telemetry
    }

    // ============================================================================
    // Sessions
    // ============================================================================

    /// Fetches the session list and reconciles it into the store.
    pub async fn load_sessions(&self) -> Result<Vec<Arc<ChatSession>>> {
        let payload = self
            .request("load_sessions", SESSIONS_PATH, Method::Get, None, None)
            .await?;
        let fresh: Vec<ChatSession> = coerce_list(payload, "sessions");
        Ok(self.store.reconcile(fresh).await)
    }

    /// Creates a session on the server, inserts it first and makes it current.
    pub async fn create_session(&self, title: &str) -> Result<Arc<ChatSession>> {
        let body = json!({ "title": title });
        let payload = self
            .request("create_session", SESSIONS_PATH, Method::Post, Some(body), None)
            .await?;
        let session: ChatSession = serde_json::from_value(payload)?;

        tracing::info!("[ChatService] created session {}", session.id);
        Ok(self.store.insert_session(session).await)
    }

    pub async fn select_session(&self, session_id: &str) -> Result<Arc<ChatSession>> {
        self.store.select(session_id).await
    }

    /// Deletes a session on the server, then drops it locally.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let path = format!("{SESSIONS_PATH}/{session_id}");
        self.request("delete_session", &path, Method::Delete, None, None)
            .await?;
        self.store.remove_session(session_id).await;
        tracing::info!("[ChatService] deleted session {}", session_id);
        Ok(())
    }

    // ============================================================================
    // Messages
    // ============================================================================

    /// Returns cached messages, or fetches and caches them on a miss.
    ///
    /// The `fetch_messages` metric carries a `cache_hit` detail either way.
    pub async fn get_or_fetch_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let timer = self.telemetry.start_timer(
            "fetch_messages",
            MetricCategory::Network,
            Some(details([("session_id", json!(session_id))])),
        );

        if let Some(messages) = self.store.cached_messages(session_id).await {
            self.telemetry
                .end_timer(&timer, Some(details([("cache_hit", json!(true))])));
            return Ok(messages);
        }

        let path = format!("{SESSIONS_PATH}/{session_id}/messages");
        let outcome = self.transport.request(&path, Method::Get, None).await;
        self.telemetry.end_timer(
            &timer,
            Some(details([
                ("cache_hit", json!(false)),
                ("success", json!(outcome.is_ok())),
            ])),
        );

        let payload = self.settle(outcome).await?;
        let messages: Vec<Message> = coerce_list(payload, "messages");
        self.store.store_fetched_messages(session_id, &messages).await;
        Ok(messages)
    }

    /// Sends a user message through the optimistic lifecycle.
    ///
    /// The message is displayed before the request goes out. The server's
    /// reply, or an error placeholder if the request fails, is appended as a
    /// separate message. A failed send is not an `Err`: the receipt carries
    /// `DeliveryState::Failed` and the error is kept in the store.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for blank content and `NotFound` for an unknown
    /// session; nothing is displayed or sent in either case. A session that
    /// disappears while the request is in flight still yields a receipt.
    pub async fn send_message(&self, session_id: &str, content: &str) -> Result<SendReceipt> {
        if content.trim().is_empty() {
            return Err(ColloqError::validation("Message content is required"));
        }

        let local = Message::user(content);
        let mut state = DeliveryState::Drafted;
        tracing::debug!("[ChatService] {} {:?}", local.id, state);

        self.store
            .append_optimistic(session_id, local.clone())
            .await?;
        state = DeliveryState::Displayed;
        tracing::debug!("[ChatService] {} {:?}", local.id, state);

        let path = format!("{SESSIONS_PATH}/{session_id}/messages");
        let body = json!({ "content": content, "stream": false });
        let outcome = self
            .request(
                "send_message",
                &path,
                Method::Post,
                Some(body),
                Some(details([("session_id", json!(session_id))])),
            )
            .await
            .and_then(parse_reply);

        let reply = match outcome {
            Ok(reply) => {
                state = DeliveryState::Confirmed;
                reply
            }
            Err(err) => {
                let error = err.user_message();
                tracing::warn!("[ChatService] send to {} failed: {}", session_id, error);
                self.store.set_error(error.clone()).await;
                state = DeliveryState::Failed {
                    error: error.clone(),
                };
                error_placeholder(&error)
            }
        };

        // The session may have been deleted or reconciled away in flight.
        match self.store.append_optimistic(session_id, reply.clone()).await {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {
                tracing::debug!(
                    "[ChatService] {} gone before reply landed; not appending",
                    session_id
                );
            }
            Err(err) => return Err(err),
        }
        tracing::debug!("[ChatService] {} {:?}", local.id, state);

        Ok(SendReceipt {
            local,
            reply,
            state,
        })
    }

    pub async fn append_optimistic(
        &self,
        session_id: &str,
        message: Message,
    ) -> Result<Arc<ChatSession>> {
        self.store.append_optimistic(session_id, message).await
    }

    pub async fn reconcile(&self, fresh: Vec<ChatSession>) -> Vec<Arc<ChatSession>> {
        self.store.reconcile(fresh).await
    }

    pub async fn evict(&self, session_id: &str) -> bool {
        self.store.evict(session_id).await
    }

    // ============================================================================
    // Transport
    // ============================================================================

    /// Issues a timed request and records its outcome in the store.
    async fn request(
        &self,
        operation: &str,
        path: &str,
        method: Method,
        body: Option<Value>,
        extra: Option<Details>,
    ) -> Result<Value> {
        let mut start = details([("path", json!(path)), ("method", json!(method.to_string()))]);
        if let Some(extra) = extra {
            start.extend(extra);
        }
        let timer = self
            .telemetry
            .start_timer(operation, MetricCategory::Network, Some(start));

        let outcome = self.transport.request(path, method, body).await;

        let mut end = details([("success", json!(outcome.is_ok()))]);
        if let Err(err) = &outcome {
            if let Some(status) = err.status {
                end.insert("status".to_string(), json!(status));
            }
        }
        self.telemetry.end_timer(&timer, Some(end));

        self.settle(outcome).await
    }

    async fn settle(
        &self,
        outcome: std::result::Result<Value, TransportError>,
    ) -> Result<Value> {
        match outcome {
            Ok(payload) => {
                self.store.clear_error().await;
                Ok(payload)
            }
            Err(err) => {
                let err = ColloqError::from(err);
                tracing::warn!("[ChatService] request failed: {}", err);
                self.store.set_error(err.user_message()).await;
                Err(err)
            }
        }
    }
}

fn details<const N: usize>(entries: [(&str, Value); N]) -> Details {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Decodes a collection payload, treating anything but an array as empty.
///
/// Elements that fail to decode are skipped individually.
fn coerce_list<T: DeserializeOwned>(payload: Value, what: &str) -> Vec<T> {
    let Value::Array(items) = payload else {
        tracing::warn!(
            "[ChatService] expected a list of {}, got {}; using an empty list",
            what,
            kind_of(&payload)
        );
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!("[ChatService] skipping malformed entry in {}: {}", what, e);
                None
            }
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The send endpoint wraps its reply as `{ "response": message }`.
fn parse_reply(payload: Value) -> Result<Message> {
    let reply = match payload {
        Value::Object(mut map) if map.contains_key("response") => {
            map.remove("response").unwrap_or(Value::Null)
        }
        other => other,
    };
    Ok(serde_json::from_value(reply)?)
}

fn error_placeholder(error: &str) -> Message {
    Message::assistant(format!("Sorry, the message could not be delivered: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloq_core::session::MessageRole;

    #[test]
    fn test_coerce_list_rejects_non_arrays() {
        let sessions: Vec<ChatSession> = coerce_list(json!({ "detail": "oops" }), "sessions");
        assert!(sessions.is_empty());

        let sessions: Vec<ChatSession> = coerce_list(Value::Null, "sessions");
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_coerce_list_skips_malformed_entries() {
        let payload = json!([
            { "id": "a", "title": "A" },
            { "title": "no id" },
            42,
            { "session_id": "b", "last_activity": "2024-01-01T00:00:00" }
        ]);
        let sessions: Vec<ChatSession> = coerce_list(payload, "sessions");

        let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(sessions[1].updated_at, "2024-01-01T00:00:00");
    }

    #[test]
    fn test_parse_reply_unwraps_response() {
        let payload = json!({
            "response": {
                "id": "ai-1",
                "content": "hello",
                "role": "assistant",
                "timestamp": 1_700_000_000.5,
                "session_id": "s1"
            }
        });
        let reply = parse_reply(payload).unwrap();
        assert_eq!(reply.id, "ai-1");
        assert_eq!(reply.role, MessageRole::Assistant);
    }

    #[test]
    fn test_parse_reply_rejects_garbage() {
        let err = parse_reply(json!({ "response": "text only" })).unwrap_err();
        assert!(matches!(err, ColloqError::Serialization { .. }));
    }
}
