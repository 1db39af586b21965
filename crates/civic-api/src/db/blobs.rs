//! Uploaded files stored as `BYTEA` rows.

use async_trait::async_trait;
use sqlx::PgPool;

use civic_core::BlobId;

use crate::blob::{Blob, BlobError, BlobStore, MAX_BLOB_BYTES};

fn unavailable(err: sqlx::Error) -> BlobError {
    BlobError::Unavailable(err.to_string())
}

/// PostgreSQL-backed [`BlobStore`] sharing the API's connection pool.
#[derive(Debug, Clone)]
pub struct PgBlobStore {
    pool: PgPool,
}

impl PgBlobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlobStore for PgBlobStore {
    async fn put(&self, blob: Blob) -> Result<BlobId, BlobError> {
        if blob.bytes.len() > MAX_BLOB_BYTES {
            return Err(BlobError::TooLarge {
                size: blob.bytes.len(),
            });
        }
        let id = BlobId::new();
        sqlx::query(
            "INSERT INTO blobs (id, content_type, bytes, created_at) VALUES ($1, $2, $3, NOW())",
        )
        .bind(*id.as_uuid())
        .bind(&blob.content_type)
        .bind(&blob.bytes)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(id)
    }

    async fn get(&self, id: BlobId) -> Result<Blob, BlobError> {
        let row: Option<(String, Vec<u8>)> =
            sqlx::query_as("SELECT content_type, bytes FROM blobs WHERE id = $1")
                .bind(*id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(unavailable)?;
        row.map(|(content_type, bytes)| Blob {
            content_type,
            bytes,
        })
        .ok_or(BlobError::NotFound(id))
    }

    async fn exists(&self, id: BlobId) -> Result<bool, BlobError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM blobs WHERE id = $1)")
            .bind(*id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)
    }

    async fn delete(&self, id: BlobId) -> Result<(), BlobError> {
        let result = sqlx::query("DELETE FROM blobs WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        if result.rows_affected() == 0 {
            return Err(BlobError::NotFound(id));
        }
        Ok(())
    }
}
