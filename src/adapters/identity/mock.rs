//! Static identity validator for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{ChatError, Identity};
use crate::ports::IdentityValidator;

/// Accepts a fixed token -> identity table; everything else fails.
#[derive(Default)]
pub struct StaticIdentityValidator {
    tokens: HashMap<String, Identity>,
}

impl StaticIdentityValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }
}

#[async_trait]
impl IdentityValidator for StaticIdentityValidator {
    async fn validate(&self, token: &str) -> Result<Identity, ChatError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| ChatError::authentication("Invalid token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    #[tokio::test]
    async fn known_token_resolves_identity() {
        let validator = StaticIdentityValidator::new().with_token(
            "token-1",
            Identity::new(UserId::new("100001").unwrap(), "Alice"),
        );

        let identity = validator.validate("token-1").await.unwrap();
        assert_eq!(identity.name, "Alice");
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let validator = StaticIdentityValidator::new();
        let err = validator.validate("nope").await.unwrap_err();
        assert_eq!(err.code(), "AUTHENTICATION_ERROR");
    }
}
