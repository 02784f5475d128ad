//! Session domain module.
//!
//! This module contains all session-related domain models and the transport
//! boundary the session services call through.
//!
//! # Module Structure
//!
//! - `model`: Core session domain model (`ChatSession`)
//! - `message`: Message types (`MessageRole`, `Message`, `DeliveryState`)
//! - `metrics`: Derived per-session statistics (`SessionMetrics`)
//! - `transport`: Injected network capability (`ChatTransport`)
//!
//! # Usage
//!
//! ```ignore
//! use colloq_core::session::{ChatSession, Message, MessageRole};
//! use colloq_core::session::{ChatTransport, Method, TransportError};
//! ```

mod message;
mod metrics;
mod model;
mod transport;

// Re-export public API
pub use message::{DeliveryState, Message, MessageMetadata, MessageRole};
pub use metrics::SessionMetrics;
pub use model::{ChatSession, preview_of};
pub use transport::{
    ChatTransport, GENERIC_FAILURE_MESSAGE, Method, TransportError, extract_error_message,
};
