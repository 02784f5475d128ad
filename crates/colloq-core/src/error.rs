//! Error types for the Colloq core.

use crate::session::TransportError;
use serde::Serialize;
use thiserror::Error;

/// A shared error type for the entire Colloq workspace.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait.
#[derive(Error, Debug, Clone, Serialize)]
pub enum ColloqError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Network failure surfaced from the transport collaborator
    #[error("{message}")]
    Network {
        status: Option<u16>,
        message: String,
    },

    /// Rejected input (e.g. an empty message)
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ColloqError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Network error without an HTTP status
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a network failure
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// The string shown to the user for this error.
    ///
    /// Network failures surface only the extracted cause; everything else uses
    /// the full display form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<TransportError> for ColloqError {
    fn from(err: TransportError) -> Self {
        Self::Network {
            status: err.status,
            message: err.message(),
        }
    }
}

impl From<std::io::Error> for ColloqError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ColloqError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ColloqError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ColloqError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (used at the infrastructure edge)
impl From<anyhow::Error> for ColloqError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, ColloqError>`.
pub type Result<T> = std::result::Result<T, ColloqError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transport_error_surfaces_detail_only() {
        let err: ColloqError =
            TransportError::with_payload(Some(429), json!({ "detail": "quota exceeded" })).into();

        assert!(err.is_network());
        assert_eq!(err.user_message(), "quota exceeded");
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[test]
    fn not_found_display_includes_entity() {
        let err = ColloqError::not_found("ChatSession", "abc");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Entity not found: ChatSession 'abc'");
    }

    #[test]
    fn io_error_converts_with_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ColloqError = io.into();
        assert!(err.to_string().contains("NotFound"));
    }
}
