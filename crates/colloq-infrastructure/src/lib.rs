//! Infrastructure layer for Colloq.
//!
//! Host-facing implementations of the core's collaborator traits, plus
//! configuration loading.

pub mod config_service;
pub mod in_memory_transport;
pub mod paths;
pub mod sysinfo_probe;

pub use config_service::ConfigService;
pub use in_memory_transport::{InMemoryTransport, Responder};
pub use paths::{ColloqPaths, PathError};
pub use sysinfo_probe::SysinfoMemoryProbe;
