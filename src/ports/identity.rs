//! IdentityValidator port - delegated credential validation.

use async_trait::async_trait;

use crate::domain::{ChatError, Identity};

/// Validates a bearer token against the external identity collaborator.
///
/// # Contract
///
/// - Must be consulted before any other operation on a connection or
///   request is permitted.
/// - Fails closed: timeouts and collaborator outages are
///   `ChatError::Authentication`, never a pass-through.
#[async_trait]
pub trait IdentityValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<Identity, ChatError>;
}
