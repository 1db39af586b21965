//! Document request persistence.
//!
//! All functions take a `&PgPool` and operate on the `document_requests`
//! table. The `ref` column carries a UNIQUE constraint; a collision surfaces
//! as [`StoreError::UniqueViolation`] so the allocator can retry.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use civic_core::{ActorId, BlobId, DocumentTypeId, Reference, RequestId, Timestamp};
use civic_state::{Applicant, DocumentRequest, LifecycleStatus, RequestStatus, TransitionRecord};

use super::{decode_json, decode_status, encode_json, map_sqlx};
use crate::store::StoreError;

const COLUMNS: &str = "id, ref, user_id, full_name, contact_number, address, purpose, age, \
     marital_status, edu_attainment, edu_course, doc_type_id, uploaded_file_id, status, \
     approved_by, approved_at, created_at, updated_at, transitions";

pub async fn insert(pool: &PgPool, request: &DocumentRequest) -> Result<(), StoreError> {
    let transitions = encode_json(&request.transitions)?;
    let a = &request.applicant;

    sqlx::query(
        "INSERT INTO document_requests (id, ref, user_id, full_name, contact_number, address,
             purpose, age, marital_status, edu_attainment, edu_course, doc_type_id,
             uploaded_file_id, status, approved_by, approved_at, created_at, updated_at, transitions)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)",
    )
    .bind(*request.id.as_uuid())
    .bind(request.reference.to_code())
    .bind(request.user_id.as_ref().map(ActorId::as_str))
    .bind(&a.full_name)
    .bind(&a.contact_number)
    .bind(&a.address)
    .bind(&a.purpose)
    .bind(i32::from(a.age))
    .bind(&a.marital_status)
    .bind(&a.edu_attainment)
    .bind(&a.edu_course)
    .bind(*request.doc_type_id.as_uuid())
    .bind(request.uploaded_file_id.map(|b| *b.as_uuid()))
    .bind(request.status.as_str())
    .bind(request.approved_by.as_ref().map(ActorId::as_str))
    .bind(request.approved_at.map(|t| *t.as_datetime()))
    .bind(*request.created_at.as_datetime())
    .bind(*request.updated_at.as_datetime())
    .bind(&transitions)
    .execute(pool)
    .await
    .map_err(map_sqlx)?;

    Ok(())
}

pub async fn get_by_id(pool: &PgPool, id: RequestId) -> Result<Option<DocumentRequest>, StoreError> {
    let row = sqlx::query_as::<_, RequestRow>(&format!(
        "SELECT {COLUMNS} FROM document_requests WHERE id = $1"
    ))
    .bind(*id.as_uuid())
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx)?;

    row.map(RequestRow::into_record).transpose()
}

pub async fn get_by_ref(
    pool: &PgPool,
    reference: Reference,
) -> Result<Option<DocumentRequest>, StoreError> {
    let row = sqlx::query_as::<_, RequestRow>(&format!(
        "SELECT {COLUMNS} FROM document_requests WHERE ref = $1"
    ))
    .bind(reference.to_code())
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx)?;

    row.map(RequestRow::into_record).transpose()
}

/// All requests, newest first.
pub async fn list(pool: &PgPool) -> Result<Vec<DocumentRequest>, StoreError> {
    let rows = sqlx::query_as::<_, RequestRow>(&format!(
        "SELECT {COLUMNS} FROM document_requests ORDER BY created_at DESC, ref DESC"
    ))
    .fetch_all(pool)
    .await
    .map_err(map_sqlx)?;

    rows.into_iter().map(RequestRow::into_record).collect()
}

/// Write the mutable lifecycle columns if the stored status is still `expected`.
pub async fn replace_if(
    pool: &PgPool,
    updated: &DocumentRequest,
    expected: RequestStatus,
) -> Result<bool, StoreError> {
    let transitions = encode_json(&updated.transitions)?;

    let result = sqlx::query(
        "UPDATE document_requests
         SET status = $2, approved_by = $3, approved_at = $4, updated_at = $5, transitions = $6
         WHERE id = $1 AND status = $7",
    )
    .bind(*updated.id.as_uuid())
    .bind(updated.status.as_str())
    .bind(updated.approved_by.as_ref().map(ActorId::as_str))
    .bind(updated.approved_at.map(|t| *t.as_datetime()))
    .bind(*updated.updated_at.as_datetime())
    .bind(&transitions)
    .bind(expected.as_str())
    .execute(pool)
    .await
    .map_err(map_sqlx)?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &PgPool, id: RequestId) -> Result<Option<DocumentRequest>, StoreError> {
    let row = sqlx::query_as::<_, RequestRow>(&format!(
        "DELETE FROM document_requests WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(*id.as_uuid())
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx)?;

    row.map(RequestRow::into_record).transpose()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct RequestRow {
    id: Uuid,
    #[sqlx(rename = "ref")]
    reference: String,
    user_id: Option<String>,
    full_name: String,
    contact_number: String,
    address: String,
    purpose: String,
    age: i32,
    marital_status: Option<String>,
    edu_attainment: Option<String>,
    edu_course: Option<String>,
    doc_type_id: Uuid,
    uploaded_file_id: Option<Uuid>,
    status: String,
    approved_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    transitions: serde_json::Value,
}

fn actor(raw: Option<String>) -> Result<Option<ActorId>, StoreError> {
    raw.map(ActorId::new)
        .transpose()
        .map_err(|e| StoreError::Corrupt(e.to_string()))
}

impl RequestRow {
    fn into_record(self) -> Result<DocumentRequest, StoreError> {
        let reference =
            Reference::parse(&self.reference).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let age = u16::try_from(self.age)
            .map_err(|_| StoreError::Corrupt(format!("age {} out of range", self.age)))?;
        let transitions: Vec<TransitionRecord<RequestStatus>> = decode_json(self.transitions)?;

        Ok(DocumentRequest {
            id: RequestId::from_uuid(self.id),
            reference,
            user_id: actor(self.user_id)?,
            applicant: Applicant {
                full_name: self.full_name,
                contact_number: self.contact_number,
                address: self.address,
                purpose: self.purpose,
                age,
                marital_status: self.marital_status,
                edu_attainment: self.edu_attainment,
                edu_course: self.edu_course,
            },
            doc_type_id: DocumentTypeId::from_uuid(self.doc_type_id),
            uploaded_file_id: self.uploaded_file_id.map(BlobId::from_uuid),
            status: decode_status(&self.status)?,
            approved_by: actor(self.approved_by)?,
            approved_at: self.approved_at.map(Timestamp::from_utc),
            created_at: Timestamp::from_utc(self.created_at),
            updated_at: Timestamp::from_utc(self.updated_at),
            transitions,
        })
    }
}
