//! MediaStorage port - binary object upload via the media collaborator.

use async_trait::async_trait;

use crate::domain::ChatError;

/// Uploads a binary payload and returns the URL that becomes the message
/// content for `image`/`file` sends. Resolution happens before
/// persistence; a failed upload fails the send with no partial write.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<String, ChatError>;
}
