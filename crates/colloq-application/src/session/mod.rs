//! Optimistic client-side session state.
//!
//! [`SessionStore`] is the entry point. It composes the bounded message
//! cache, the identity-preserving [`Reconciler`] and the
//! [`OptimisticMessageInserter`] over one lock.

pub mod cache;
pub mod inserter;
pub mod reconciler;
pub mod state;
pub mod store;

pub use cache::{CacheStats, SessionCache};
pub use inserter::OptimisticMessageInserter;
pub use reconciler::Reconciler;
pub use state::SessionState;
pub use store::SessionStore;
