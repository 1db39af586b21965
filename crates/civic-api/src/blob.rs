//! # Blob Storage
//!
//! Uploaded ID images live outside the civic store and are referenced from
//! requests by [`BlobId`]. Deleting a request removes its blob on a
//! best-effort basis: failures are logged, never surfaced.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

use civic_core::{BlobId, CivicError};

/// Largest accepted upload.
pub const MAX_BLOB_BYTES: usize = 5 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlobError {
    #[error("blob {0} not found")]
    NotFound(BlobId),

    #[error("blob of {size} bytes exceeds the {MAX_BLOB_BYTES}-byte limit")]
    TooLarge { size: usize },

    #[error("blob storage unavailable: {0}")]
    Unavailable(String),
}

impl From<BlobError> for CivicError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::NotFound(_) => Self::NotFound(err.to_string()),
            BlobError::TooLarge { .. } => Self::Validation(err.to_string()),
            BlobError::Unavailable(msg) => Self::StorageUnavailable(msg),
        }
    }
}

/// A stored file and its declared media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    async fn put(&self, blob: Blob) -> Result<BlobId, BlobError>;

    async fn get(&self, id: BlobId) -> Result<Blob, BlobError>;

    async fn exists(&self, id: BlobId) -> Result<bool, BlobError>;

    async fn delete(&self, id: BlobId) -> Result<(), BlobError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<BlobId, Blob>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, blob: Blob) -> Result<BlobId, BlobError> {
        if blob.bytes.len() > MAX_BLOB_BYTES {
            return Err(BlobError::TooLarge {
                size: blob.bytes.len(),
            });
        }
        let id = BlobId::new();
        self.blobs.write().insert(id, blob);
        Ok(id)
    }

    async fn get(&self, id: BlobId) -> Result<Blob, BlobError> {
        self.blobs
            .read()
            .get(&id)
            .cloned()
            .ok_or(BlobError::NotFound(id))
    }

    async fn exists(&self, id: BlobId) -> Result<bool, BlobError> {
        Ok(self.blobs.read().contains_key(&id))
    }

    async fn delete(&self, id: BlobId) -> Result<(), BlobError> {
        self.blobs
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(BlobError::NotFound(id))
    }
}

/// Public download path of a blob.
pub fn blob_url(id: BlobId) -> String {
    format!("/api/files/{}", id.as_uuid())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> Blob {
        Blob {
            content_type: "image/png".into(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[tokio::test]
    async fn put_get_delete() {
        let store = MemoryBlobStore::new();
        let id = store.put(png()).await.unwrap();
        assert!(store.exists(id).await.unwrap());
        assert_eq!(store.get(id).await.unwrap(), png());
        store.delete(id).await.unwrap();
        assert!(!store.exists(id).await.unwrap());
        assert_eq!(store.delete(id).await, Err(BlobError::NotFound(id)));
    }

    #[tokio::test]
    async fn rejects_oversized_blob() {
        let store = MemoryBlobStore::new();
        let blob = Blob {
            content_type: "image/jpeg".into(),
            bytes: vec![0; MAX_BLOB_BYTES + 1],
        };
        assert!(matches!(
            store.put(blob).await,
            Err(BlobError::TooLarge { .. })
        ));
    }

    #[test]
    fn url_uses_bare_uuid() {
        let id = BlobId::new();
        assert_eq!(blob_url(id), format!("/api/files/{}", id.as_uuid()));
    }
}
