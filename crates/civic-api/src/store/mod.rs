//! # Storage Handle
//!
//! [`CivicStore`] is the single seam between the service layer and
//! persistence. Two implementations exist:
//!
//! - [`MemoryStore`]: `parking_lot`-guarded maps, for development and tests.
//! - [`crate::db::PgStore`]: PostgreSQL via SQLx, selected when
//!   `DATABASE_URL` is set.
//!
//! Every mutating operation here is atomic with respect to concurrent
//! callers of the same backend. Lifecycle rules live in `civic-state`; the
//! store only offers compare-and-set on the status column so a transition
//! decided on a stale read can never be written.

pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use civic_core::{
    Bucket, CivicError, ComplaintId, DocumentTypeId, Reference, RequestId, Timestamp,
};
use civic_state::{
    CatalogEntry, Complaint, ComplaintStatus, DocumentRequest, DocumentType, RequestStatus,
};

pub use memory::MemoryStore;

/// Storage-level failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A row the operation depends on does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A unique constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// The backend could not be reached or timed out.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be decoded.
    #[error("corrupt stored data: {0}")]
    Corrupt(String),

    /// The backend refused the statement for a reason other than a
    /// unique constraint.
    #[error("storage rejected the operation: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<StoreError> for CivicError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::UniqueViolation(msg) => Self::Conflict(msg),
            StoreError::Unavailable(msg) => Self::StorageUnavailable(msg),
            // Not retried.
            StoreError::Corrupt(msg) => Self::StorageUnavailable(format!("corrupt data: {msg}")),
            StoreError::Rejected(msg) => Self::StorageUnavailable(format!("rejected: {msg}")),
        }
    }
}

/// Result of upserting one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Number of stored records currently in `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCount<S> {
    pub status: S,
    pub count: u64,
}

/// Records created on one civic-local calendar day that share `key`.
///
/// Aggregates are ordered by `day`, then by `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCount<K> {
    pub day: NaiveDate,
    pub key: K,
    pub count: u64,
}

/// Persistence operations required by the civic services.
#[async_trait]
pub trait CivicStore: Send + Sync + std::fmt::Debug {
    // ── Reference counters ──────────────────────────────────────────

    /// Atomically increment the bucket's counter and return the new value.
    /// The first call for a bucket returns 1.
    async fn next_sequence(&self, bucket: Bucket) -> Result<u32, StoreError>;

    /// Last sequence issued in the bucket, 0 when none.
    async fn last_sequence(&self, bucket: Bucket) -> Result<u32, StoreError>;

    // ── Document requests ───────────────────────────────────────────

    /// Insert a new request. Fails with `UniqueViolation` when the id or
    /// reference already exists.
    async fn insert_request(&self, request: &DocumentRequest) -> Result<(), StoreError>;

    async fn get_request(&self, id: RequestId) -> Result<Option<DocumentRequest>, StoreError>;

    async fn find_request(&self, reference: Reference) -> Result<Option<DocumentRequest>, StoreError>;

    /// All requests, newest first.
    async fn list_requests(&self) -> Result<Vec<DocumentRequest>, StoreError>;

    /// Replace the stored request only if its status is still `expected`.
    ///
    /// Returns `false` when the row is gone or its status has moved on.
    async fn replace_request_if(
        &self,
        updated: &DocumentRequest,
        expected: RequestStatus,
    ) -> Result<bool, StoreError>;

    /// Delete a request, returning it.
    async fn delete_request(&self, id: RequestId) -> Result<Option<DocumentRequest>, StoreError>;

    // ── Complaints ──────────────────────────────────────────────────

    async fn insert_complaint(&self, complaint: &Complaint) -> Result<(), StoreError>;

    async fn get_complaint(&self, id: ComplaintId) -> Result<Option<Complaint>, StoreError>;

    /// All complaints, newest first.
    async fn list_complaints(&self) -> Result<Vec<Complaint>, StoreError>;

    async fn replace_complaint_if(
        &self,
        updated: &Complaint,
        expected: ComplaintStatus,
    ) -> Result<bool, StoreError>;

    async fn delete_complaint(&self, id: ComplaintId) -> Result<Option<Complaint>, StoreError>;

    // ── Document types ──────────────────────────────────────────────

    /// All document types, ordered by name.
    async fn list_document_types(&self) -> Result<Vec<DocumentType>, StoreError>;

    async fn get_document_type(&self, id: DocumentTypeId) -> Result<Option<DocumentType>, StoreError>;

    /// Insert a document type. Fails with `UniqueViolation` on a duplicate name.
    async fn insert_document_type(&self, doc_type: &DocumentType) -> Result<(), StoreError>;

    /// Overwrite a stored document type by id. Returns `false` if absent.
    async fn update_document_type(&self, doc_type: &DocumentType) -> Result<bool, StoreError>;

    /// Create or update by name, writing only when something differs.
    async fn upsert_document_type(
        &self,
        entry: &CatalogEntry,
        now: Timestamp,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Delete a document type by exact name. Returns whether a row was removed.
    async fn delete_document_type_by_name(&self, name: &str) -> Result<bool, StoreError>;

    // ── Aggregates ──────────────────────────────────────────────────

    /// Requests per status, in lifecycle order. Statuses with no requests
    /// are omitted.
    async fn count_requests_by_status(
        &self,
    ) -> Result<Vec<StatusCount<RequestStatus>>, StoreError>;

    /// Complaints per status. Statuses with no complaints are omitted.
    async fn count_complaints_by_status(
        &self,
    ) -> Result<Vec<StatusCount<ComplaintStatus>>, StoreError>;

    /// Requests created at or after `since`, per civic-local day and
    /// document type name. The name is `None` when the type no longer
    /// exists; those groups sort first within a day.
    async fn daily_requests_by_doc_type(
        &self,
        since: Timestamp,
    ) -> Result<Vec<DailyCount<Option<String>>>, StoreError>;

    /// Complaints created at or after `since`, per civic-local day and
    /// current status. Within a day, groups follow lifecycle order.
    async fn daily_complaints_by_status(
        &self,
        since: Timestamp,
    ) -> Result<Vec<DailyCount<ComplaintStatus>>, StoreError>;

    // ── Health ──────────────────────────────────────────────────────

    /// Cheap round trip used by the readiness check.
    async fn ping(&self) -> Result<(), StoreError>;
}
