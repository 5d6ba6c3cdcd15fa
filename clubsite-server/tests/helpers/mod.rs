//! Shared fakes and request builders for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use clubsite_common::api::TokenRejection;
use clubsite_common::config::ServiceConfig;
use clubsite_server::auth::{TokenVerifier, VerifiedToken, VerifyError};
use clubsite_server::db::{
    Document, DocumentStore, MemoryDocumentStore, OrderBy, StoreError, StoredDocument, WriteMode,
};
use clubsite_server::storage::{MemoryObjectStore, ObjectStore, StorageError};
use clubsite_server::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN_TOKEN: &str = "admin-token";
pub const MEMBER_TOKEN: &str = "member-token";
pub const PUBLIC_PREFIX: &str = "https://storage.test/club-media/";

/// Accepts two fixed tokens: one admin, one regular member
pub struct FakeVerifier;

#[async_trait]
impl TokenVerifier for FakeVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, VerifyError> {
        match token {
            ADMIN_TOKEN => Ok(VerifiedToken {
                subject: "admin-uid".to_string(),
                is_admin: true,
            }),
            MEMBER_TOKEN => Ok(VerifiedToken {
                subject: "member-uid".to_string(),
                is_admin: false,
            }),
            "expired-token" => Err(VerifyError::Rejected(TokenRejection::Expired)),
            _ => Err(VerifyError::Rejected(TokenRejection::Invalid("unknown".to_string()))),
        }
    }
}

/// Memory object store that counts calls and can fail uploads
pub struct CountingObjectStore {
    inner: MemoryObjectStore,
    pub puts: AtomicUsize,
    pub deletes: AtomicUsize,
    /// Uploads succeed until this many have been stored
    fail_puts_after: Option<usize>,
}

impl CountingObjectStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryObjectStore::new(PUBLIC_PREFIX),
            puts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            fail_puts_after: None,
        }
    }

    pub fn failing_after(successful_puts: usize) -> Self {
        Self {
            fail_puts_after: Some(successful_puts),
            ..Self::new()
        }
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub async fn object_count(&self) -> usize {
        self.inner.object_count().await
    }

    pub async fn keys(&self) -> Vec<String> {
        self.inner.keys().await
    }
}

#[async_trait]
impl ObjectStore for CountingObjectStore {
    fn public_url_prefix(&self) -> Result<String, StorageError> {
        self.inner.public_url_prefix()
    }

    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        let previous = self.puts.fetch_add(1, Ordering::SeqCst);
        if matches!(self.fail_puts_after, Some(limit) if previous >= limit) {
            return Err(StorageError::Transport("connection reset".to_string()));
        }
        self.inner.put(key, bytes, content_type).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }
}

/// Memory document store that counts calls and can fail writes
pub struct CountingDocumentStore {
    pub inner: MemoryDocumentStore,
    pub writes: AtomicUsize,
    pub reads: AtomicUsize,
    fail_writes: AtomicBool,
}

impl CountingDocumentStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryDocumentStore::new(),
            writes: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let store = Self::new();
        store.fail_writes.store(true, Ordering::SeqCst);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend {
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for CountingDocumentStore {
    async fn insert(&self, collection: &str, data: Document) -> Result<String, StoreError> {
        self.check_write()?;
        self.inner.insert(collection, data).await
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        data: Document,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.upsert(collection, id, data, mode).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(collection, id).await
    }

    async fn list(
        &self,
        collection: &str,
        order: Option<&OrderBy>,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.list(collection, order).await
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_field(collection, field, value).await
    }
}

/// Router plus handles on its fake backends
pub struct TestApp {
    pub router: Router,
    pub objects: Arc<CountingObjectStore>,
    pub documents: Arc<CountingDocumentStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_stores(CountingObjectStore::new(), CountingDocumentStore::new())
    }

    pub fn with_stores(objects: CountingObjectStore, documents: CountingDocumentStore) -> Self {
        Self::with_config(objects, documents, &ServiceConfig::default())
    }

    pub fn with_config(
        objects: CountingObjectStore,
        documents: CountingDocumentStore,
        config: &ServiceConfig,
    ) -> Self {
        let objects = Arc::new(objects);
        let documents = Arc::new(documents);
        let state = AppState::from_parts(
            Arc::new(FakeVerifier),
            objects.clone(),
            documents.clone(),
            config,
        );
        Self {
            router: build_router(state),
            objects,
            documents,
        }
    }

    /// Send a request and decode the JSON response body
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// POST a multipart form with the admin token
    pub async fn post_form(&self, uri: &str, form: MultipartForm) -> (StatusCode, Value) {
        self.send(form.into_request(uri, Some(ADMIN_TOKEN))).await
    }
}

/// Hand-built `multipart/form-data` body
#[derive(Default)]
pub struct MultipartForm {
    parts: Vec<u8>,
}

const BOUNDARY: &str = "----clubsite-test-boundary";

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.parts.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.parts.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.parts.extend_from_slice(bytes);
        self.parts.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str, token: Option<&str>) -> Request<Body> {
        self.parts
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(self.parts)).unwrap()
    }
}

/// Minimal PNG signature, enough to look like an image upload
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0];
