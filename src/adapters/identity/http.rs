//! HTTP adapter for the identity collaborator.
//!
//! Validates bearer tokens against `GET {base}/users/validate`. Fails
//! closed: timeouts, connection errors, and non-success statuses all
//! come back as `ChatError::Authentication`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{ChatError, Identity, UserId};
use crate::ports::IdentityValidator;

#[derive(Clone)]
pub struct HttpIdentityValidator {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    user: ValidatedUser,
}

#[derive(Debug, Deserialize)]
struct ValidatedUser {
    user_id: String,
    name: String,
}

impl HttpIdentityValidator {
    /// Builds the adapter with a bounded per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn validate_url(&self) -> String {
        format!("{}/users/validate", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl IdentityValidator for HttpIdentityValidator {
    async fn validate(&self, token: &str) -> Result<Identity, ChatError> {
        let response = self
            .http
            .get(self.validate_url())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                // Unreachable or slow identity service rejects the caller.
                ChatError::authentication(format!("Identity service unavailable: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(ChatError::authentication("Invalid token"));
        }

        let body: ValidateResponse = response
            .json()
            .await
            .map_err(|e| ChatError::authentication(format!("Malformed identity response: {}", e)))?;

        let user_id = UserId::new(body.user.user_id)
            .map_err(|_| ChatError::authentication("Identity response missing user id"))?;
        Ok(Identity::new(user_id, body.user.name))
    }
}
