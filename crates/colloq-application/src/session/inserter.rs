//! Optimistic message insertion.
//!
//! This module provides `OptimisticMessageInserter` which applies a locally
//! authored message to every view of a session before the server has
//! confirmed it.

use super::state::SessionState;
use colloq_core::config::CacheConfig;
use colloq_core::error::{ColloqError, Result};
use colloq_core::session::{ChatSession, Message};
use std::sync::Arc;

/// Applies one message to all session views as a single step.
///
/// `append` performs, against one `&mut SessionState` borrow:
/// 1. Appending to the session in the collection (bumping `updated_at`)
/// 2. Re-pointing the current session if it is the same session
/// 3. Appending to the message cache if the session has an entry
/// 4. Recomputing the session's metrics
///
/// An unknown session id fails before anything is touched.
#[derive(Debug, Clone)]
pub struct OptimisticMessageInserter {
    preview_length: usize,
    empty_preview: String,
}

impl OptimisticMessageInserter {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            preview_length: config.preview_length,
            empty_preview: config.empty_preview.clone(),
        }
    }

    /// Appends `message` to the session and returns the updated record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no session with `session_id` is stored.
    pub fn append(
        &self,
        state: &mut SessionState,
        session_id: &str,
        message: Message,
    ) -> Result<Arc<ChatSession>> {
        let index = state
            .position(session_id)
            .ok_or_else(|| ColloqError::not_found("Session", session_id))?;

        // Copy-on-write: readers holding the old Arc keep the old snapshot.
        let mut updated = ChatSession::clone(&state.sessions[index]);
        updated.push_message(message.clone(), self.preview_length, &self.empty_preview);
        let updated = Arc::new(updated);
        state.sessions[index] = Arc::clone(&updated);

        if state.is_current(session_id) {
            state.current = Some(Arc::clone(&updated));
        }

        let cached = state.cache.append(session_id, message);
        state.refresh_metrics(&updated);

        tracing::debug!(
            "[OptimisticMessageInserter] session {} now has {} messages (cached: {})",
            session_id,
            updated.message_count,
            cached
        );

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(session: ChatSession, cached: bool, current: bool) -> SessionState {
        let mut state = SessionState::new(3);
        if cached {
            state.cache.populate(session.id.clone(), &session.messages);
        }
        let session = Arc::new(session);
        if current {
            state.current = Some(Arc::clone(&session));
        }
        state.sessions.push(session);
        state
    }

    #[test]
    fn test_append_updates_all_views() {
        let inserter = OptimisticMessageInserter::new(&CacheConfig::default());
        let mut state = state_with(ChatSession::new("s1", "One"), true, true);

        let updated = inserter
            .append(&mut state, "s1", Message::user("hello"))
            .unwrap();

        assert_eq!(updated.message_count, 1);
        assert!(Arc::ptr_eq(state.current().unwrap(), &updated));
        assert_eq!(state.cache().len("s1"), 1);
        assert_eq!(state.metrics("s1").unwrap().total_messages, 1);
        assert!(state.is_consistent());
    }

    #[test]
    fn test_append_to_unknown_session_changes_nothing() {
        let inserter = OptimisticMessageInserter::new(&CacheConfig::default());
        let mut state = state_with(ChatSession::new("s1", "One"), true, true);
        let before = Arc::clone(&state.sessions()[0]);

        let err = inserter
            .append(&mut state, "ghost", Message::user("hello"))
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(Arc::ptr_eq(&state.sessions()[0], &before));
        assert!(state.metrics("ghost").is_none());
    }

    #[test]
    fn test_non_current_session_leaves_pointer_alone() {
        let inserter = OptimisticMessageInserter::new(&CacheConfig::default());
        let mut state = state_with(ChatSession::new("s1", "One"), false, false);
        let other = Arc::new(ChatSession::new("s2", "Two"));
        state.sessions.push(Arc::clone(&other));
        state.current = Some(Arc::clone(&other));

        inserter
            .append(&mut state, "s1", Message::user("hello"))
            .unwrap();

        assert!(Arc::ptr_eq(state.current().unwrap(), &other));
        assert!(!state.cache().contains("s1"));
    }

    #[test]
    fn test_append_bumps_updated_at() {
        let inserter = OptimisticMessageInserter::new(&CacheConfig::default());
        let mut session = ChatSession::new("s1", "One");
        session.updated_at = "2000-01-01T00:00:00+00:00".to_string();
        let mut state = state_with(session, false, false);

        let updated = inserter
            .append(&mut state, "s1", Message::user("hello"))
            .unwrap();

        assert_ne!(updated.updated_at, "2000-01-01T00:00:00+00:00");
    }
}
