//! Upstream collaborator configuration (identity and media services).

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the identity collaborator (`GET /users/validate`)
    pub user_api_url: String,

    /// Base URL of the media collaborator (`POST /media/upload`)
    pub media_api_url: String,

    /// Bound on identity-validation round-trips, in seconds. Expiry
    /// fails the handshake closed.
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_secs: u64,
}

impl UpstreamConfig {
    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, url) in [
            ("USER_API_URL", &self.user_api_url),
            ("MEDIA_API_URL", &self.media_api_url),
        ] {
            if url.is_empty() {
                return Err(ValidationError::MissingRequired(name));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidUpstreamUrl);
            }
        }
        if self.auth_timeout_secs == 0 || self.auth_timeout_secs > 60 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_auth_timeout() -> u64 {
    5
}
