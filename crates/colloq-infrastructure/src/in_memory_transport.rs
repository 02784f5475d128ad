//! In-process stand-in for the chat backend.
//!
//! `InMemoryTransport` answers the `/chat/sessions` endpoints from memory with
//! the same payload shapes the real backend uses, so the session services can
//! be driven without a network. Failures and latency can be injected.

use async_trait::async_trait;
use colloq_core::session::{ChatTransport, Method, TransportError};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

const SESSIONS_PATH: &str = "/chat/sessions";

/// Produces the assistant's answer for a user message.
pub type Responder = Box<dyn Fn(&str) -> String + Send + Sync>;

struct StoredSession {
    id: String,
    title: String,
    created_at: String,
    last_activity: String,
    messages: Vec<Value>,
}

impl StoredSession {
    fn listing(&self) -> Value {
        let preview = self
            .messages
            .last()
            .and_then(|m| m["content"].as_str())
            .map(str::to_string);
        json!({
            "id": self.id,
            "title": self.title,
            "created_at": self.created_at,
            "updated_at": self.last_activity,
            "last_activity": self.last_activity,
            "message_count": self.messages.len(),
            "status": "active",
            "last_message_preview": preview,
        })
    }
}

#[derive(Default)]
struct Backend {
    sessions: Vec<StoredSession>,
    failures: VecDeque<TransportError>,
    next_id: u64,
    calls: Vec<(Method, String)>,
}

impl Backend {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn find_mut(&mut self, session_id: &str) -> Option<&mut StoredSession> {
        self.sessions.iter_mut().find(|s| s.id == session_id)
    }
}

/// Scripted chat backend living in process memory.
pub struct InMemoryTransport {
    backend: Mutex<Backend>,
    latency: Option<Duration>,
    responder: Responder,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            backend: Mutex::new(Backend::default()),
            latency: None,
            responder: Box::new(|content| format!("I received your message: '{content}'.")),
        }
    }

    /// Delays every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Replaces the assistant's answer generator.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.responder = Box::new(responder);
        self
    }

    /// Seeds a session with alternating user/assistant messages.
    pub fn seed_session(&self, title: &str, exchanges: &[(&str, &str)]) -> String {
        let mut backend = self.lock();
        let id = backend.next_id("session");
        let now = now_iso();

        let mut messages = Vec::with_capacity(exchanges.len() * 2);
        for (n, (question, answer)) in exchanges.iter().enumerate() {
            messages.push(message_json(&format!("user-{n}"), "user", question, json!(now)));
            messages.push(message_json(
                &format!("assistant-{n}"),
                "assistant",
                answer,
                json!(now),
            ));
        }

        backend.sessions.push(StoredSession {
            id: id.clone(),
            title: title.to_string(),
            created_at: now.clone(),
            last_activity: now,
            messages,
        });
        id
    }

    /// Makes the next request fail with `error` instead of being served.
    pub fn fail_next(&self, error: TransportError) {
        self.lock().failures.push_back(error);
    }

    /// Total number of requests received.
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Number of requests received for one method and path.
    pub fn calls_to(&self, method: Method, path: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|(m, p)| *m == method && p == path)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Backend> {
        self.backend.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn route(
        &self,
        backend: &mut Backend,
        path: &str,
        method: Method,
        body: Option<Value>,
    ) -> Result<Value, TransportError> {
        let Some(rest) = path.strip_prefix(SESSIONS_PATH) else {
            return Err(not_found("Not Found"));
        };
        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

        match (method, segments.as_slice()) {
            (Method::Get, []) => Ok(Value::Array(
                backend.sessions.iter().map(StoredSession::listing).collect(),
            )),
            (Method::Post, []) => {
                let title = body
                    .as_ref()
                    .and_then(|b| b["title"].as_str())
                    .unwrap_or("New Chat")
                    .to_string();
                let id = backend.next_id("session");
                let now = now_iso();
                backend.sessions.insert(
                    0,
                    StoredSession {
                        id: id.clone(),
                        title: title.clone(),
                        created_at: now.clone(),
                        last_activity: now.clone(),
                        messages: Vec::new(),
                    },
                );
                Ok(json!({
                    "id": id,
                    "title": title,
                    "created_at": now,
                    "updated_at": now,
                    "last_activity": now,
                    "message_count": 0,
                    "status": "active",
                    "is_active": true,
                    "messages": [],
                }))
            }
            (Method::Delete, [session_id]) => {
                let before = backend.sessions.len();
                backend.sessions.retain(|s| s.id != *session_id);
                if backend.sessions.len() == before {
                    return Err(not_found("Session not found"));
                }
                Ok(json!({
                    "message": format!("Session {session_id} deleted successfully"),
                    "status": "success",
                }))
            }
            (Method::Get, [session_id, "messages"]) => Ok(backend
                .find_mut(session_id)
                .map(|s| Value::Array(s.messages.clone()))
                .unwrap_or_else(|| json!([]))),
            (Method::Post, [session_id, "messages"]) => {
                let content = body
                    .as_ref()
                    .and_then(|b| b["content"].as_str())
                    .unwrap_or_default()
                    .to_string();
                if content.is_empty() {
                    return Err(TransportError::with_payload(
                        Some(400),
                        json!({ "detail": "Message content is required" }),
                    ));
                }

                let user_id = backend.next_id("user");
                let reply_id = backend.next_id("ai");
                let answer = (self.responder)(&content);
                let Some(session) = backend.find_mut(session_id) else {
                    return Err(not_found("Session not found"));
                };

                let now = now_iso();
                let reply = message_json(&reply_id, "assistant", &answer, json!(now_epoch_secs()));
                session
                    .messages
                    .push(message_json(&user_id, "user", &content, json!(now)));
                session.messages.push(reply.clone());
                session.last_activity = now;

                Ok(json!({ "response": reply }))
            }
            _ => Err(not_found("Not Found")),
        }
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for InMemoryTransport {
    async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<Value>,
    ) -> Result<Value, TransportError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut backend = self.lock();
        backend.calls.push((method, path.to_string()));
        tracing::debug!("[InMemoryTransport] {} {}", method, path);

        if let Some(error) = backend.failures.pop_front() {
            tracing::debug!("[InMemoryTransport] injected failure: {}", error);
            return Err(error);
        }
        self.route(&mut backend, path, method, body)
    }
}

fn not_found(detail: &str) -> TransportError {
    TransportError::with_payload(Some(404), json!({ "detail": detail }))
}

fn message_json(id: &str, role: &str, content: &str, timestamp: Value) -> Value {
    json!({
        "id": id,
        "content": content,
        "role": role,
        "timestamp": timestamp,
    })
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn now_epoch_secs() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_list() {
        let transport = InMemoryTransport::new();
        let created = transport
            .request(SESSIONS_PATH, Method::Post, Some(json!({ "title": "Hello" })))
            .await
            .unwrap();

        let listing = transport
            .request(SESSIONS_PATH, Method::Get, None)
            .await
            .unwrap();

        assert_eq!(listing[0]["id"], created["id"]);
        assert_eq!(listing[0]["message_count"], 0);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_send_message_wraps_reply() {
        let transport = InMemoryTransport::new().with_responder(|c| c.to_uppercase());
        let id = transport.seed_session("Seeded", &[]);
        let path = format!("{SESSIONS_PATH}/{id}/messages");

        let reply = transport
            .request(&path, Method::Post, Some(json!({ "content": "hi" })))
            .await
            .unwrap();
        assert_eq!(reply["response"]["content"], "HI");
        assert!(reply["response"]["timestamp"].is_f64());

        let history = transport.request(&path, Method::Get, None).await.unwrap();
        assert_eq!(history.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_empty_content_is_rejected() {
        let transport = InMemoryTransport::new();
        let id = transport.seed_session("Seeded", &[]);

        let err = transport
            .request(
                &format!("{SESSIONS_PATH}/{id}/messages"),
                Method::Post,
                Some(json!({ "content": "" })),
            )
            .await
            .unwrap_err();

        assert_eq!(err.status, Some(400));
        assert_eq!(err.message(), "Message content is required");
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed_once() {
        let transport = InMemoryTransport::new();
        transport.fail_next(TransportError::with_payload(
            Some(429),
            json!({ "detail": "quota exceeded" }),
        ));

        let err = transport
            .request(SESSIONS_PATH, Method::Get, None)
            .await
            .unwrap_err();
        assert_eq!(err.message(), "quota exceeded");

        assert!(transport.request(SESSIONS_PATH, Method::Get, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_unknown_session_is_not_found() {
        let transport = InMemoryTransport::new();
        let err = transport
            .request(&format!("{SESSIONS_PATH}/ghost"), Method::Delete, None)
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(404));
    }
}
