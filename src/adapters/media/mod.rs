//! Media collaborator adapters.
//!
//! `image`/`file` sends upload their payload to the media service first;
//! the returned URL becomes the message content. The upload happens
//! before persistence, so a failed upload fails the send cleanly.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::ChatError;
use crate::ports::MediaStorage;

/// HTTP adapter posting `multipart/form-data` to `POST {base}/media/upload`.
#[derive(Clone)]
pub struct HttpMediaStorage {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

impl HttpMediaStorage {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn upload_url(&self) -> String {
        format!("{}/media/upload", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl MediaStorage for HttpMediaStorage {
    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<String, ChatError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ChatError::transport(format!("Media upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ChatError::transport(format!(
                "Media service returned {}",
                response.status()
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| ChatError::transport(format!("Malformed media response: {}", e)))?;
        Ok(body.url)
    }
}

/// Test double returning deterministic URLs and recording uploads.
#[derive(Default)]
pub struct StaticMediaStorage {
    uploads: Mutex<Vec<String>>,
}

impl StaticMediaStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.uploads.lock().expect("upload log poisoned").clone()
    }
}

#[async_trait]
impl MediaStorage for StaticMediaStorage {
    async fn upload(&self, filename: &str, _bytes: Vec<u8>) -> Result<String, ChatError> {
        self.uploads
            .lock()
            .expect("upload log poisoned")
            .push(filename.to_string());
        Ok(format!("https://media.test/uploads/{}", filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_url_normalizes_trailing_slash() {
        let storage = HttpMediaStorage::new(reqwest::Client::new(), "http://media.local/");
        assert_eq!(storage.upload_url(), "http://media.local/media/upload");
    }

    #[tokio::test]
    async fn static_storage_returns_deterministic_url() {
        let storage = StaticMediaStorage::new();
        let url = storage.upload("cat.png", vec![1, 2, 3]).await.unwrap();
        assert_eq!(url, "https://media.test/uploads/cat.png");
        assert_eq!(storage.uploaded(), vec!["cat.png".to_string()]);
    }
}
