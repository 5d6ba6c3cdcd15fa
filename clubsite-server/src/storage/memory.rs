//! In-process object store for development and tests

use async_trait::async_trait;
use axum::body::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{ObjectStore, StorageError};

/// Object held by the memory store
#[derive(Debug, Clone)]
pub struct MemoryObject {
    pub bytes: Bytes,
    pub content_type: String,
}

/// HashMap-backed object store
pub struct MemoryObjectStore {
    public_prefix: String,
    objects: RwLock<HashMap<String, MemoryObject>>,
}

impl MemoryObjectStore {
    /// Create a store whose public URLs start with `public_prefix`
    pub fn new(public_prefix: impl Into<String>) -> Self {
        let mut public_prefix = public_prefix.into();
        if !public_prefix.ends_with('/') {
            public_prefix.push('/');
        }
        Self {
            public_prefix,
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<MemoryObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn public_url_prefix(&self) -> Result<String, StorageError> {
        Ok(self.public_prefix.clone())
    }

    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.objects.write().await.insert(
            key.to_string(),
            MemoryObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self.objects.write().await.remove(key) {
            Some(_) => Ok(()),
            None => Err(StorageError::Backend {
                status: 404,
                message: format!("No such object: {}", key),
            }),
        }
    }
}
