//! Document store access layer
//!
//! `DocumentStore` is the seam to the external document database: flat named
//! collections of JSON-like documents addressed by id. `DocumentWriter` is the
//! write front-end the orchestrator uses (timeouts, error mapping, redaction).

pub mod codec;
pub mod firestore;
pub mod memory;

use async_trait::async_trait;
use clubsite_common::api::redact_secrets;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub use firestore::FirestoreStore;
pub use memory::MemoryDocumentStore;

/// Document body: top-level field name to value
pub type Document = Map<String, Value>;

/// How an upsert treats fields already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Deep merge: nested maps are merged key by key; fields absent from the
    /// write are preserved
    Merge,
    /// Every supplied top-level field replaces the stored value wholesale;
    /// fields absent from the write are preserved
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Single-field ordering for list queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Descending,
        }
    }
}

/// A document together with its id
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

/// Document store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Required backend configuration missing; no call was attempted
    #[error("Document store not configured: {0}")]
    NotConfigured(String),

    /// Network failure talking to the store
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    /// Store answered with a non-success status
    #[error("Document store error {status}: {message}")]
    Backend { status: u16, message: String },

    /// Stored data could not be decoded
    #[error("Invalid document data: {0}")]
    Codec(String),
}

/// External document database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert with a backend-generated id, returning the id
    async fn insert(&self, collection: &str, data: Document) -> Result<String, StoreError>;

    /// Create or update the document at `id`
    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        data: Document,
        mode: WriteMode,
    ) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError>;

    /// All documents of a collection, optionally ordered
    ///
    /// With an ordering, documents lacking the field are omitted (the
    /// document database's own query semantics).
    async fn list(
        &self,
        collection: &str,
        order: Option<&OrderBy>,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Documents whose string field equals `value`
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<StoredDocument>, StoreError>;
}

/// Write failures as reported to the orchestrator
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("{0}")]
    NotConfigured(String),

    #[error("Failed to save document: {0}")]
    Persistence(String),
}

/// Write front-end over a `DocumentStore`
pub struct DocumentWriter {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
    secrets: Vec<String>,
}

impl DocumentWriter {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration, secrets: Vec<String>) -> Self {
        Self {
            store,
            timeout,
            secrets,
        }
    }

    /// Write a document
    ///
    /// With `id` this is an upsert in the given mode; without, a pure insert
    /// with a generated id. Returns the document id either way.
    pub async fn write(
        &self,
        collection: &str,
        id: Option<&str>,
        data: Document,
        mode: WriteMode,
    ) -> Result<String, WriteError> {
        debug!(collection = %collection, id = ?id, fields = data.len(), mode = ?mode, "Writing document");

        let write = async {
            match id {
                Some(id) => self
                    .store
                    .upsert(collection, id, data, mode)
                    .await
                    .map(|()| id.to_string()),
                None => self.store.insert(collection, data).await,
            }
        };

        let result = tokio::time::timeout(self.timeout, write).await.map_err(|_| {
            WriteError::Persistence(format!(
                "document write timed out after {} ms",
                self.timeout.as_millis()
            ))
        })?;

        let id = result.map_err(|e| self.failure(e))?;
        info!(collection = %collection, id = %id, "Document written");
        Ok(id)
    }

    /// Fields currently stored at `id`, `None` when the document does not exist
    ///
    /// Used before a write to tell a create from an update.
    pub async fn current(&self, collection: &str, id: &str) -> Result<Option<Document>, WriteError> {
        let read = self.store.get(collection, id);
        let result = tokio::time::timeout(self.timeout, read).await.map_err(|_| {
            WriteError::Persistence(format!(
                "document read timed out after {} ms",
                self.timeout.as_millis()
            ))
        })?;

        let stored = result.map_err(|e| self.failure(e))?;
        debug!(collection = %collection, id = %id, exists = stored.is_some(), "Read current document");
        Ok(stored.map(|doc| doc.data))
    }

    fn failure(&self, error: StoreError) -> WriteError {
        match error {
            StoreError::NotConfigured(msg) => WriteError::NotConfigured(msg),
            e => {
                let secrets: Vec<&str> = self.secrets.iter().map(String::as_str).collect();
                WriteError::Persistence(redact_secrets(&e.to_string(), &secrets))
            }
        }
    }
}
