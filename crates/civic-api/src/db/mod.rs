//! # Database Persistence Layer
//!
//! PostgreSQL implementation of [`CivicStore`] and [`BlobStore`] via SQLx.
//!
//! ## Architecture
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, the API
//! stores requests, complaints, document types, reference counters and
//! uploaded files in PostgreSQL. When absent, the in-memory backends are used
//! (development and tests).
//!
//! ## Atomicity
//!
//! - Reference counters: one `INSERT … ON CONFLICT DO UPDATE … RETURNING`.
//! - Status transitions: `UPDATE … WHERE id = $1 AND status = $expected`.
//! - Catalog upsert: `INSERT … ON CONFLICT (name) DO UPDATE … WHERE IS DISTINCT FROM`.
//!
//! Dashboard and analytics counts are single `GROUP BY` statements in
//! [`analytics`].
//!
//! Lifecycle rules are enforced in `civic-state`, not in SQL.

pub mod analytics;
pub mod blobs;
pub mod complaints;
pub mod counters;
pub mod document_types;
pub mod requests;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

use civic_core::{Bucket, ComplaintId, DocumentTypeId, Reference, RequestId, Timestamp};
use civic_state::{
    CatalogEntry, Complaint, ComplaintStatus, DocumentRequest, DocumentType, LifecycleStatus,
    RequestStatus,
};

use crate::store::{CivicStore, DailyCount, StatusCount, StoreError, UpsertOutcome};

pub use blobs::PgBlobStore;

/// Connect to PostgreSQL and run the embedded migrations.
pub async fn init_pool(url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Classify a driver error for the retry and HTTP layers.
pub(crate) fn map_sqlx(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::UniqueViolation(db.message().to_string())
        }
        sqlx::Error::Database(db) => StoreError::Rejected(db.message().to_string()),
        sqlx::Error::RowNotFound => StoreError::NotFound("row not found".into()),
        err @ (sqlx::Error::Decode(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::TypeNotFound { .. }) => StoreError::Corrupt(err.to_string()),
        err @ (sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed) => StoreError::Unavailable(err.to_string()),
        other => StoreError::Rejected(other.to_string()),
    }
}

/// Parse a stored status column.
pub(crate) fn decode_status<S: LifecycleStatus>(raw: &str) -> Result<S, StoreError> {
    civic_state::parse_status(raw).map_err(|e| StoreError::Corrupt(e.to_string()))
}

pub(crate) fn encode_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

/// PostgreSQL-backed [`CivicStore`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CivicStore for PgStore {
    async fn next_sequence(&self, bucket: Bucket) -> Result<u32, StoreError> {
        counters::increment(&self.pool, bucket).await
    }

    async fn last_sequence(&self, bucket: Bucket) -> Result<u32, StoreError> {
        counters::current(&self.pool, bucket).await
    }

    async fn insert_request(&self, request: &DocumentRequest) -> Result<(), StoreError> {
        requests::insert(&self.pool, request).await
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<DocumentRequest>, StoreError> {
        requests::get_by_id(&self.pool, id).await
    }

    async fn find_request(&self, reference: Reference) -> Result<Option<DocumentRequest>, StoreError> {
        requests::get_by_ref(&self.pool, reference).await
    }

    async fn list_requests(&self) -> Result<Vec<DocumentRequest>, StoreError> {
        requests::list(&self.pool).await
    }

    async fn replace_request_if(
        &self,
        updated: &DocumentRequest,
        expected: RequestStatus,
    ) -> Result<bool, StoreError> {
        requests::replace_if(&self.pool, updated, expected).await
    }

    async fn delete_request(&self, id: RequestId) -> Result<Option<DocumentRequest>, StoreError> {
        requests::delete(&self.pool, id).await
    }

    async fn insert_complaint(&self, complaint: &Complaint) -> Result<(), StoreError> {
        complaints::insert(&self.pool, complaint).await
    }

    async fn get_complaint(&self, id: ComplaintId) -> Result<Option<Complaint>, StoreError> {
        complaints::get_by_id(&self.pool, id).await
    }

    async fn list_complaints(&self) -> Result<Vec<Complaint>, StoreError> {
        complaints::list(&self.pool).await
    }

    async fn replace_complaint_if(
        &self,
        updated: &Complaint,
        expected: ComplaintStatus,
    ) -> Result<bool, StoreError> {
        complaints::replace_if(&self.pool, updated, expected).await
    }

    async fn delete_complaint(&self, id: ComplaintId) -> Result<Option<Complaint>, StoreError> {
        complaints::delete(&self.pool, id).await
    }

    async fn list_document_types(&self) -> Result<Vec<DocumentType>, StoreError> {
        document_types::list(&self.pool).await
    }

    async fn get_document_type(&self, id: DocumentTypeId) -> Result<Option<DocumentType>, StoreError> {
        document_types::get_by_id(&self.pool, id).await
    }

    async fn insert_document_type(&self, doc_type: &DocumentType) -> Result<(), StoreError> {
        document_types::insert(&self.pool, doc_type).await
    }

    async fn update_document_type(&self, doc_type: &DocumentType) -> Result<bool, StoreError> {
        document_types::update(&self.pool, doc_type).await
    }

    async fn upsert_document_type(
        &self,
        entry: &CatalogEntry,
        now: Timestamp,
    ) -> Result<UpsertOutcome, StoreError> {
        document_types::upsert(&self.pool, entry, now).await
    }

    async fn delete_document_type_by_name(&self, name: &str) -> Result<bool, StoreError> {
        document_types::delete_by_name(&self.pool, name).await
    }

    async fn count_requests_by_status(
        &self,
    ) -> Result<Vec<StatusCount<RequestStatus>>, StoreError> {
        analytics::request_status_counts(&self.pool).await
    }

    async fn count_complaints_by_status(
        &self,
    ) -> Result<Vec<StatusCount<ComplaintStatus>>, StoreError> {
        analytics::complaint_status_counts(&self.pool).await
    }

    async fn daily_requests_by_doc_type(
        &self,
        since: Timestamp,
    ) -> Result<Vec<DailyCount<Option<String>>>, StoreError> {
        analytics::daily_requests(&self.pool, since).await
    }

    async fn daily_complaints_by_status(
        &self,
        since: Timestamp,
    ) -> Result<Vec<DailyCount<ComplaintStatus>>, StoreError> {
        analytics::daily_complaints(&self.pool, since).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx)
    }
}
