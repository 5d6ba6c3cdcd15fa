//! Object storage: uploads under generated keys, rollback by public URL
//!
//! `ObjectStore` is the seam to the external blob service. `Uploader` wraps a
//! store with key generation, content-type defaulting, timeouts and secret
//! redaction, and is what the orchestrator talks to.
//!
//! Keys carry a millisecond stamp that is unique per `Uploader`: two uploads
//! in the same millisecond get consecutive stamps, so same-named files never
//! share a key.

pub mod gcs;
pub mod memory;

use async_trait::async_trait;
use axum::body::Bytes;
use clubsite_common::api::redact_secrets;
use clubsite_common::sanitize::sanitize_filename;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use gcs::GcsObjectStore;
pub use memory::MemoryObjectStore;

/// Content type used when the upload does not declare one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Object store errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backing configuration (bucket name) missing
    #[error("Object storage unavailable: {0}")]
    Unavailable(String),

    /// Network or stream failure talking to the store
    #[error("Transport error: {0}")]
    Transport(String),

    /// Store answered with a non-success status
    #[error("Storage API error {status}: {message}")]
    Backend { status: u16, message: String },
}

/// External blob store
///
/// Objects written through `put` must be publicly readable under
/// `public_url_prefix() + key`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// URL prefix of every public object, ending in `/`
    fn public_url_prefix(&self) -> Result<String, StorageError>;

    /// Store bytes under `key` and make the object publicly readable
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// Remove the object stored under `key`
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// One file part received from a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original filename as sent by the browser
    pub file_name: String,
    /// Declared content type, if any
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.map(str::to_string),
            bytes: bytes.into(),
        }
    }

    /// Content type to store, falling back to a generic binary type
    pub fn effective_content_type(&self) -> &str {
        match self.content_type.as_deref() {
            Some(ct) if !ct.trim().is_empty() => ct,
            _ => DEFAULT_CONTENT_TYPE,
        }
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

/// Upload failures as reported to the orchestrator
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    StorageUnavailable(String),

    #[error("File upload failed: {0}")]
    UploadFailed(String),
}

/// Build an object key: `<prefix>/<unixMillis>_<sanitizedName>`
pub fn object_key(prefix: &str, unix_millis: i64, original_name: &str) -> String {
    format!(
        "{}/{}_{}",
        prefix.trim_matches('/'),
        unix_millis,
        sanitize_filename(original_name)
    )
}

/// Derive the object key from a public URL by stripping the bucket root
pub fn key_from_url(public_prefix: &str, url: &str) -> Option<String> {
    let key = url.strip_prefix(public_prefix)?;
    let key = key.split(['?', '#']).next().unwrap_or_default();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Upload front-end used by the orchestrator
pub struct Uploader {
    store: Arc<dyn ObjectStore>,
    timeout: Duration,
    secrets: Vec<String>,
    /// Last stamp handed out for a key
    last_stamp: AtomicI64,
}

impl Uploader {
    pub fn new(store: Arc<dyn ObjectStore>, timeout: Duration, secrets: Vec<String>) -> Self {
        Self {
            store,
            timeout,
            secrets,
            last_stamp: AtomicI64::new(0),
        }
    }

    /// Current time in milliseconds, bumped past the previous stamp if needed
    fn next_stamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let previous = self
            .last_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }

    fn redact(&self, message: &str) -> String {
        let secrets: Vec<&str> = self.secrets.iter().map(String::as_str).collect();
        redact_secrets(message, &secrets)
    }

    /// Store a file under a freshly generated key and return its public URL
    pub async fn upload(&self, file: &UploadedFile, prefix: &str) -> Result<StoredObject, UploadError> {
        let public_prefix = self
            .store
            .public_url_prefix()
            .map_err(|e| UploadError::StorageUnavailable(self.redact(&e.to_string())))?;

        let key = object_key(prefix, self.next_stamp(), &file.file_name);
        let content_type = file.effective_content_type();

        debug!(key = %key, content_type = %content_type, size = file.bytes.len(), "Uploading object");

        let put = self.store.put(&key, file.bytes.clone(), content_type);
        match tokio::time::timeout(self.timeout, put).await {
            Ok(Ok(())) => {}
            Ok(Err(StorageError::Unavailable(msg))) => {
                return Err(UploadError::StorageUnavailable(self.redact(&msg)));
            }
            Ok(Err(e)) => return Err(UploadError::UploadFailed(self.redact(&e.to_string()))),
            Err(_) => {
                return Err(UploadError::UploadFailed(format!(
                    "upload timed out after {} ms",
                    self.timeout.as_millis()
                )));
            }
        }

        let url = format!("{}{}", public_prefix, key);
        info!(key = %key, url = %url, "Object uploaded");
        Ok(StoredObject { key, url })
    }

    /// Best-effort delete of a previously uploaded object
    ///
    /// Never fails: the outcome is logged and returned as a flag so the
    /// caller's original error stays the one reported.
    pub async fn rollback(&self, url: &str) -> bool {
        let prefix = match self.store.public_url_prefix() {
            Ok(prefix) => prefix,
            Err(e) => {
                warn!(url = %url, error = %e, "Rollback skipped: storage unavailable");
                return false;
            }
        };

        let Some(key) = key_from_url(&prefix, url) else {
            warn!(url = %url, "Rollback skipped: URL is outside the storage bucket");
            return false;
        };

        match tokio::time::timeout(self.timeout, self.store.delete(&key)).await {
            Ok(Ok(())) => {
                info!(key = %key, "Rolled back uploaded object");
                true
            }
            Ok(Err(e)) => {
                warn!(key = %key, error = %self.redact(&e.to_string()), "Rollback delete failed");
                false
            }
            Err(_) => {
                warn!(key = %key, "Rollback delete timed out");
                false
            }
        }
    }
}
