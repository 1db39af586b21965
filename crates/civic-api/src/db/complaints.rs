//! Complaint persistence against the `complaints` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use civic_core::{ActorId, ComplaintId, Reference, Timestamp};
use civic_state::{Complaint, ComplaintDetails, ComplaintStatus, LifecycleStatus, TransitionRecord};

use super::{decode_json, decode_status, encode_json, map_sqlx};
use crate::store::StoreError;

const COLUMNS: &str = "id, ref, reporter_name, contact_number, address, complaint_type, \
     description, status, processed_by, resolved_at, created_at, updated_at, transitions";

pub async fn insert(pool: &PgPool, complaint: &Complaint) -> Result<(), StoreError> {
    let transitions = encode_json(&complaint.transitions)?;
    let d = &complaint.details;

    sqlx::query(
        "INSERT INTO complaints (id, ref, reporter_name, contact_number, address, complaint_type,
             description, status, processed_by, resolved_at, created_at, updated_at, transitions)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(*complaint.id.as_uuid())
    .bind(complaint.reference.to_code())
    .bind(&d.reporter_name)
    .bind(&d.contact_number)
    .bind(&d.address)
    .bind(&d.complaint_type)
    .bind(&d.description)
    .bind(complaint.status.as_str())
    .bind(complaint.processed_by.as_ref().map(ActorId::as_str))
    .bind(complaint.resolved_at.map(|t| *t.as_datetime()))
    .bind(*complaint.created_at.as_datetime())
    .bind(*complaint.updated_at.as_datetime())
    .bind(&transitions)
    .execute(pool)
    .await
    .map_err(map_sqlx)?;

    Ok(())
}

pub async fn get_by_id(pool: &PgPool, id: ComplaintId) -> Result<Option<Complaint>, StoreError> {
    let row = sqlx::query_as::<_, ComplaintRow>(&format!(
        "SELECT {COLUMNS} FROM complaints WHERE id = $1"
    ))
    .bind(*id.as_uuid())
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx)?;

    row.map(ComplaintRow::into_record).transpose()
}

pub async fn list(pool: &PgPool) -> Result<Vec<Complaint>, StoreError> {
    let rows = sqlx::query_as::<_, ComplaintRow>(&format!(
        "SELECT {COLUMNS} FROM complaints ORDER BY created_at DESC, ref DESC"
    ))
    .fetch_all(pool)
    .await
    .map_err(map_sqlx)?;

    rows.into_iter().map(ComplaintRow::into_record).collect()
}

pub async fn replace_if(
    pool: &PgPool,
    updated: &Complaint,
    expected: ComplaintStatus,
) -> Result<bool, StoreError> {
    let transitions = encode_json(&updated.transitions)?;

    let result = sqlx::query(
        "UPDATE complaints
         SET status = $2, processed_by = $3, resolved_at = $4, updated_at = $5, transitions = $6
         WHERE id = $1 AND status = $7",
    )
    .bind(*updated.id.as_uuid())
    .bind(updated.status.as_str())
    .bind(updated.processed_by.as_ref().map(ActorId::as_str))
    .bind(updated.resolved_at.map(|t| *t.as_datetime()))
    .bind(*updated.updated_at.as_datetime())
    .bind(&transitions)
    .bind(expected.as_str())
    .execute(pool)
    .await
    .map_err(map_sqlx)?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &PgPool, id: ComplaintId) -> Result<Option<Complaint>, StoreError> {
    let row = sqlx::query_as::<_, ComplaintRow>(&format!(
        "DELETE FROM complaints WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(*id.as_uuid())
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx)?;

    row.map(ComplaintRow::into_record).transpose()
}

#[derive(sqlx::FromRow)]
struct ComplaintRow {
    id: Uuid,
    #[sqlx(rename = "ref")]
    reference: String,
    reporter_name: String,
    contact_number: Option<String>,
    address: Option<String>,
    complaint_type: String,
    description: String,
    status: String,
    processed_by: Option<String>,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    transitions: serde_json::Value,
}

impl ComplaintRow {
    fn into_record(self) -> Result<Complaint, StoreError> {
        let reference =
            Reference::parse(&self.reference).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let processed_by = self
            .processed_by
            .map(ActorId::new)
            .transpose()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let transitions: Vec<TransitionRecord<ComplaintStatus>> = decode_json(self.transitions)?;

        Ok(Complaint {
            id: ComplaintId::from_uuid(self.id),
            reference,
            details: ComplaintDetails {
                reporter_name: self.reporter_name,
                contact_number: self.contact_number,
                address: self.address,
                complaint_type: self.complaint_type,
                description: self.description,
            },
            status: decode_status(&self.status)?,
            processed_by,
            resolved_at: self.resolved_at.map(Timestamp::from_utc),
            created_at: Timestamp::from_utc(self.created_at),
            updated_at: Timestamp::from_utc(self.updated_at),
            transitions,
        })
    }
}
