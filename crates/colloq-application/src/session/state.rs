use super::cache::SessionCache;
use colloq_core::session::{ChatSession, SessionMetrics};
use std::collections::HashMap;
use std::sync::Arc;

/// Everything the store guards with a single lock.
///
/// Keeping the collection, the current pointer, the message cache and the
/// per-session metrics together lets an optimistic append update all four
/// in one critical section.
#[derive(Debug)]
pub struct SessionState {
    pub(crate) sessions: Vec<Arc<ChatSession>>,
    pub(crate) current: Option<Arc<ChatSession>>,
    pub(crate) cache: SessionCache,
    pub(crate) metrics: HashMap<String, SessionMetrics>,
    pub(crate) last_error: Option<String>,
}

impl SessionState {
    pub fn new(max_cached_messages: usize) -> Self {
        Self {
            sessions: Vec::new(),
            current: None,
            cache: SessionCache::new(max_cached_messages),
            metrics: HashMap::new(),
            last_error: None,
        }
    }

    pub fn sessions(&self) -> &[Arc<ChatSession>] {
        &self.sessions
    }

    pub fn current(&self) -> Option<&Arc<ChatSession>> {
        self.current.as_ref()
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn metrics(&self, session_id: &str) -> Option<&SessionMetrics> {
        self.metrics.get(session_id)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn position(&self, session_id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == session_id)
    }

    pub fn find(&self, session_id: &str) -> Option<&Arc<ChatSession>> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    pub(crate) fn is_current(&self, session_id: &str) -> bool {
        self.current.as_ref().is_some_and(|c| c.id == session_id)
    }

    /// Points `current` at the collection's entry for the same id, or clears
    /// it when that session is gone.
    pub(crate) fn repoint_current(&mut self) {
        let Some(current_id) = self.current.as_ref().map(|c| c.id.clone()) else {
            return;
        };
        self.current = self.find(&current_id).cloned();
        if self.current.is_none() {
            tracing::debug!(
                "[SessionState] current session {} disappeared, pointer cleared",
                current_id
            );
        }
    }

    pub(crate) fn refresh_metrics(&mut self, session: &ChatSession) {
        self.metrics.insert(
            session.id.clone(),
            SessionMetrics::from_messages(&session.messages),
        );
    }

    /// True when every stored count matches its messages and the current
    /// pointer refers to the collection's own entry.
    pub fn is_consistent(&self) -> bool {
        let counts_ok = self.sessions.iter().all(|s| s.is_consistent());
        let current_ok = match &self.current {
            Some(current) => self
                .find(&current.id)
                .is_some_and(|entry| Arc::ptr_eq(entry, current)),
            None => true,
        };
        counts_ok && current_ok
    }
}
