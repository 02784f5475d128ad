//! Client-side session state behind a single async lock.

use super::cache::CacheStats;
use super::inserter::OptimisticMessageInserter;
use super::reconciler::Reconciler;
use super::state::SessionState;
use colloq_core::config::CacheConfig;
use colloq_core::error::{ColloqError, Result};
use colloq_core::session::{ChatSession, Message, SessionMetrics};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Owns the session collection, the current-session pointer, the message
/// cache and per-session metrics.
///
/// Every mutating operation takes the write guard once and never awaits
/// while holding it, so observers only ever see the state before or after
/// a whole operation.
pub struct SessionStore {
    state: RwLock<SessionState>,
    reconciler: Reconciler,
    inserter: OptimisticMessageInserter,
    config: CacheConfig,
}

impl SessionStore {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: RwLock::new(SessionState::new(config.max_cached_messages)),
            reconciler: Reconciler::new(&config),
            inserter: OptimisticMessageInserter::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Runs `f` against a consistent snapshot of the whole state.
    pub async fn inspect<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        let state = self.state.read().await;
        f(&state)
    }

    pub async fn sessions(&self) -> Vec<Arc<ChatSession>> {
        self.state.read().await.sessions.clone()
    }

    pub async fn session(&self, session_id: &str) -> Option<Arc<ChatSession>> {
        self.state.read().await.find(session_id).cloned()
    }

    pub async fn current_session(&self) -> Option<Arc<ChatSession>> {
        self.state.read().await.current.clone()
    }

    /// Moves the current-session pointer.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the session is not in the collection.
    pub async fn select(&self, session_id: &str) -> Result<Arc<ChatSession>> {
        let mut state = self.state.write().await;
        let session = state
            .find(session_id)
            .cloned()
            .ok_or_else(|| ColloqError::not_found("Session", session_id))?;
        state.current = Some(Arc::clone(&session));
        tracing::debug!("[SessionStore] current session -> {}", session_id);
        Ok(session)
    }

    pub async fn clear_current(&self) {
        self.state.write().await.current = None;
    }

    /// Inserts a session at the front of the collection and makes it current.
    ///
    /// A session with the same id is replaced. The session gets an empty
    /// cache entry so subsequent optimistic appends are mirrored.
    pub async fn insert_session(&self, mut session: ChatSession) -> Arc<ChatSession> {
        self.reconciler.normalize(&mut session);
        let session = Arc::new(session);

        let mut state = self.state.write().await;
        state.sessions.retain(|s| s.id != session.id);
        state.sessions.insert(0, Arc::clone(&session));
        state.current = Some(Arc::clone(&session));
        if session.messages.is_empty() {
            state.cache.ensure_entry(session.id.clone());
        } else {
            state.cache.populate(session.id.clone(), &session.messages);
        }
        state.refresh_metrics(&session);

        tracing::debug!("[SessionStore] inserted session {}", session.id);
        session
    }

    /// Removes a session with its cache entry and metrics.
    ///
    /// Clears the current pointer if it referred to the removed session.
    pub async fn remove_session(&self, session_id: &str) -> Option<Arc<ChatSession>> {
        let mut state = self.state.write().await;
        let index = state.position(session_id)?;
        let removed = state.sessions.remove(index);
        state.cache.purge(session_id);
        state.metrics.remove(session_id);
        if state.is_current(session_id) {
            state.current = None;
        }
        tracing::debug!("[SessionStore] removed session {}", session_id);
        Some(removed)
    }

    /// Applies a locally authored message to every view of the session.
    pub async fn append_optimistic(
        &self,
        session_id: &str,
        message: Message,
    ) -> Result<Arc<ChatSession>> {
        let mut state = self.state.write().await;
        self.inserter.append(&mut state, session_id, message)
    }

    /// Replaces the collection with `fresh`, reusing unchanged entries.
    ///
    /// Sessions absent from `fresh` lose their cache entry and metrics, and
    /// the current pointer follows its session or is cleared.
    pub async fn reconcile(&self, fresh: Vec<ChatSession>) -> Vec<Arc<ChatSession>> {
        let mut state = self.state.write().await;
        let merged = self.reconciler.merge(&state.sessions, fresh);

        let kept: HashSet<&str> = merged.iter().map(|s| s.id.as_str()).collect();
        let dropped: Vec<String> = state
            .sessions
            .iter()
            .filter(|s| !kept.contains(s.id.as_str()))
            .map(|s| s.id.clone())
            .collect();
        for session_id in &dropped {
            state.cache.purge(session_id);
            state.metrics.remove(session_id);
        }

        let rebuilt: Vec<Arc<ChatSession>> = merged
            .iter()
            .filter(|s| {
                !state
                    .find(&s.id)
                    .is_some_and(|previous| Arc::ptr_eq(previous, s))
            })
            .cloned()
            .collect();
        for session in &rebuilt {
            if !session.messages.is_empty() && state.cache.contains(&session.id) {
                state.cache.populate(session.id.clone(), &session.messages);
            }
            state.refresh_metrics(session);
        }

        state.sessions = merged.clone();
        state.repoint_current();

        tracing::debug!(
            "[SessionStore] reconciled {} sessions ({} rebuilt, {} dropped)",
            merged.len(),
            rebuilt.len(),
            dropped.len()
        );
        merged
    }

    /// Drops a session's message cache entry.
    ///
    /// The session record and its messages stay; the next fetch goes to the
    /// network again.
    pub async fn evict(&self, session_id: &str) -> bool {
        let evicted = self.state.write().await.cache.purge(session_id);
        if evicted {
            tracing::debug!("[SessionStore] evicted cache for {}", session_id);
        }
        evicted
    }

    /// Cached messages for a session; records a hit or a miss.
    pub async fn cached_messages(&self, session_id: &str) -> Option<Vec<Message>> {
        self.state.write().await.cache.get(session_id)
    }

    /// Stores messages fetched from the server.
    ///
    /// Populates the cache and, when the session record holds no messages
    /// yet, hydrates it so its count and preview reflect the fetch.
    pub async fn store_fetched_messages(&self, session_id: &str, messages: &[Message]) {
        let mut state = self.state.write().await;
        state.cache.populate(session_id, messages);

        let Some(index) = state.position(session_id) else {
            return;
        };
        if !state.sessions[index].messages.is_empty() || messages.is_empty() {
            return;
        }

        let mut hydrated = ChatSession::clone(&state.sessions[index]);
        hydrated.messages = messages.to_vec();
        self.reconciler.normalize(&mut hydrated);
        let hydrated = Arc::new(hydrated);
        state.sessions[index] = Arc::clone(&hydrated);
        state.refresh_metrics(&hydrated);
        state.repoint_current();
    }

    pub async fn cache_len(&self, session_id: &str) -> usize {
        self.state.read().await.cache.len(session_id)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.state.read().await.cache.stats()
    }

    pub async fn session_metrics(&self, session_id: &str) -> Option<SessionMetrics> {
        self.state.read().await.metrics.get(session_id).cloned()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    pub async fn set_error(&self, message: impl Into<String>) {
        self.state.write().await.last_error = Some(message.into());
    }

    pub async fn clear_error(&self) {
        self.state.write().await.last_error = None;
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
