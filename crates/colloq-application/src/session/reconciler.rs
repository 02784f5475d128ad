//! Identity-preserving merge of fetched sessions into cached ones.

use colloq_core::config::CacheConfig;
use colloq_core::session::ChatSession;
use std::collections::HashMap;
use std::sync::Arc;

/// Merges a freshly fetched session list with the cached one.
///
/// A fresh session whose `updated_at` and message count match the cached
/// entry with the same id is represented by the cached `Arc`, so consumers
/// comparing with [`Arc::ptr_eq`] skip unchanged rows. Anything else is
/// rebuilt with recomputed derived fields.
#[derive(Debug, Clone)]
pub struct Reconciler {
    preview_length: usize,
    empty_preview: String,
}

impl Reconciler {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            preview_length: config.preview_length,
            empty_preview: config.empty_preview.clone(),
        }
    }

    /// Returns the merged list in the order of `fresh`.
    pub fn merge(
        &self,
        existing: &[Arc<ChatSession>],
        fresh: Vec<ChatSession>,
    ) -> Vec<Arc<ChatSession>> {
        let by_id: HashMap<&str, &Arc<ChatSession>> = existing
            .iter()
            .map(|session| (session.id.as_str(), session))
            .collect();

        let mut reused = 0usize;
        let merged: Vec<Arc<ChatSession>> = fresh
            .into_iter()
            .map(|mut session| {
                let cached = by_id.get(session.id.as_str()).copied();
                if let Some(cached) = cached {
                    if Self::unchanged(cached, &session) {
                        reused += 1;
                        return Arc::clone(cached);
                    }
                    // Listings carry no message bodies; keep the ones we hold.
                    if session.messages.is_empty() {
                        session.messages = cached.messages.clone();
                    }
                }
                self.normalize(&mut session);
                Arc::new(session)
            })
            .collect();

        tracing::debug!(
            "[Reconciler] merged {} sessions ({} reused)",
            merged.len(),
            reused
        );
        merged
    }

    /// Recomputes derived fields on a session built outside the store.
    ///
    /// The stored count always follows the messages actually held, not the
    /// count a listing reported.
    pub fn normalize(&self, session: &mut ChatSession) {
        session.refresh_derived(self.preview_length, &self.empty_preview);
    }

    /// Entries built from a listing hold no bodies, so both sides are
    /// compared on their best known count rather than `messages.len()`.
    fn unchanged(cached: &ChatSession, fresh: &ChatSession) -> bool {
        cached.updated_at == fresh.updated_at && cached.known_count() == fresh.known_count()
    }
}
