//! Application layer for Colloq.
//!
//! This crate provides the optimistic session store and the chat use case
//! that ties the transport, the store and the telemetry agent together.

pub mod chat_service;
pub mod session;

pub use chat_service::{ChatService, SendReceipt};
pub use session::{
    CacheStats, OptimisticMessageInserter, Reconciler, SessionCache, SessionState, SessionStore,
};
