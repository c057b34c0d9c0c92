//! The delivery-core error taxonomy.
//!
//! Five categories, each carrying a human-readable message and a stable,
//! machine-facing code used in HTTP bodies and logs. See spec §7.

use thiserror::Error;

/// Every failure the delivery path can surface, collapsed to the five
/// spec categories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Bad, missing, or expired token — reject the connection or request.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Valid identity, but not a room member — reject the operation.
    #[error("authorization error: {0}")]
    Authorization(String),

    /// Malformed input — reject immediately, no I/O attempted.
    #[error("validation error: {0}")]
    Validation(String),

    /// Storage unavailable — terminal for the operation, never retried.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Event-bus or broadcast-adapter unavailable — logged and bounded-retried.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ChatError {
    pub fn authentication(msg: impl Into<String>) -> Self {
        ChatError::Authentication(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        ChatError::Authorization(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ChatError::Validation(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        ChatError::Persistence(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        ChatError::Transport(msg.into())
    }

    /// The stable, machine-facing code for this category.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Authentication(_) => "AUTHENTICATION_ERROR",
            ChatError::Authorization(_) => "AUTHORIZATION_ERROR",
            ChatError::Validation(_) => "VALIDATION_ERROR",
            ChatError::Persistence(_) => "PERSISTENCE_ERROR",
            ChatError::Transport(_) => "TRANSPORT_ERROR",
        }
    }
}
