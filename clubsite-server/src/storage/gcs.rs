//! Google Cloud Storage JSON API client
//!
//! Uploads use the simple media upload (`uploadType=media`) with the
//! `publicRead` predefined ACL, so the object is served at
//! `<public_base>/<bucket>/<key>` right after the call returns.

use async_trait::async_trait;
use axum::body::Bytes;
use clubsite_common::config::StorageConfig;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Url};

use super::{ObjectStore, StorageError};

/// Cloud Storage backed object store
pub struct GcsObjectStore {
    client: Client,
    api_base: String,
    public_base: String,
    bucket: Option<String>,
    access_token: Option<String>,
}

impl GcsObjectStore {
    pub fn new(client: Client, config: &StorageConfig, access_token: Option<String>) -> Self {
        Self {
            client,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            public_base: config.public_base_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone().filter(|b| !b.trim().is_empty()),
            access_token,
        }
    }

    fn bucket(&self) -> Result<&str, StorageError> {
        self.bucket
            .as_deref()
            .ok_or_else(|| StorageError::Unavailable("storage bucket name is not configured".to_string()))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: reqwest::Response) -> Result<(), StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|e| format!("unreadable error body: {}", e));
        Err(StorageError::Backend {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    fn public_url_prefix(&self) -> Result<String, StorageError> {
        Ok(format!("{}/{}/", self.public_base, self.bucket()?))
    }

    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        let bucket = self.bucket()?;
        let url = format!("{}/upload/storage/v1/b/{}/o", self.api_base, bucket);

        let request = self
            .client
            .post(url)
            .query(&[
                ("uploadType", "media"),
                ("name", key),
                ("predefinedAcl", "publicRead"),
            ])
            .header(CONTENT_TYPE, content_type)
            .body(bytes);

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        Self::check(response).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let bucket = self.bucket()?;
        let mut url = Url::parse(&format!("{}/storage/v1/b/{}/o", self.api_base, bucket))
            .map_err(|e| StorageError::Transport(format!("invalid storage URL: {}", e)))?;
        // Object names are a single path segment: `/` must be percent-encoded
        url.path_segments_mut()
            .map_err(|_| StorageError::Transport("storage URL cannot be a base".to_string()))?
            .push(key);

        let response = self
            .authorized(self.client.delete(url))
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        Self::check(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_bucket_is_unavailable() {
        let store = GcsObjectStore::new(Client::new(), &StorageConfig::default(), None);
        assert!(matches!(
            store.public_url_prefix(),
            Err(StorageError::Unavailable(_))
        ));
    }

    #[test]
    fn test_public_prefix_uses_bucket_root() {
        let config = StorageConfig {
            bucket: Some("club-media".to_string()),
            ..StorageConfig::default()
        };
        let store = GcsObjectStore::new(Client::new(), &config, None);
        assert_eq!(
            store.public_url_prefix().unwrap(),
            "https://storage.googleapis.com/club-media/"
        );
    }

    #[tokio::test]
    async fn test_put_without_bucket_fails_before_network() {
        let store = GcsObjectStore::new(Client::new(), &StorageConfig::default(), None);
        let err = store
            .put("news/1_a.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }
}
