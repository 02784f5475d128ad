pub mod config;
pub mod error;
pub mod session;
pub mod telemetry;

// Re-export common error type
pub use error::{ColloqError, Result};
