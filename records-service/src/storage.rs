//! File-storage seam for opaque attachments
//!
//! The engine never interprets attachment bytes; it stores them under an
//! opaque key and keeps only the key on the owning record.

use async_trait::async_trait;
use dashmap::DashMap;
use error_common::Result;
use uuid::Uuid;

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store `bytes` and return the key they can be fetched under.
    async fn put(&self, bytes: Vec<u8>) -> Result<String>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
}

/// In-memory file store for tests and development
pub struct InMemoryFileStore {
    blobs: DashMap<String, Vec<u8>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
        }
    }
}

impl Default for InMemoryFileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<String> {
        let key = format!("attachments/{}", Uuid::new_v4().simple());
        self.blobs.insert(key.clone(), bytes);
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(key).map(|entry| entry.value().clone()))
    }
}
