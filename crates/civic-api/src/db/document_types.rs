//! Document type catalog persistence.
//!
//! `required_fields` is stored as a sorted `TEXT[]` so the upsert can
//! compare it with `IS DISTINCT FROM` and skip writes that change nothing.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use civic_core::{DocumentTypeId, Timestamp};
use civic_state::{CatalogEntry, DocumentType, RequiredField};

use super::map_sqlx;
use crate::store::{StoreError, UpsertOutcome};

const COLUMNS: &str = "id, name, description, required_fields, created_at, updated_at";

fn encode_fields(fields: &BTreeSet<RequiredField>) -> Vec<String> {
    fields.iter().map(|f| f.as_str().to_string()).collect()
}

pub async fn list(pool: &PgPool) -> Result<Vec<DocumentType>, StoreError> {
    let rows = sqlx::query_as::<_, DocumentTypeRow>(&format!(
        "SELECT {COLUMNS} FROM document_types ORDER BY name"
    ))
    .fetch_all(pool)
    .await
    .map_err(map_sqlx)?;

    rows.into_iter().map(DocumentTypeRow::into_record).collect()
}

pub async fn get_by_id(
    pool: &PgPool,
    id: DocumentTypeId,
) -> Result<Option<DocumentType>, StoreError> {
    let row = sqlx::query_as::<_, DocumentTypeRow>(&format!(
        "SELECT {COLUMNS} FROM document_types WHERE id = $1"
    ))
    .bind(*id.as_uuid())
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx)?;

    row.map(DocumentTypeRow::into_record).transpose()
}

pub async fn insert(pool: &PgPool, doc_type: &DocumentType) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO document_types (id, name, description, required_fields, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(*doc_type.id.as_uuid())
    .bind(&doc_type.name)
    .bind(&doc_type.description)
    .bind(encode_fields(&doc_type.required_fields))
    .bind(*doc_type.created_at.as_datetime())
    .bind(*doc_type.updated_at.as_datetime())
    .execute(pool)
    .await
    .map_err(map_sqlx)?;

    Ok(())
}

pub async fn update(pool: &PgPool, doc_type: &DocumentType) -> Result<bool, StoreError> {
    let result = sqlx::query(
        "UPDATE document_types
         SET name = $2, description = $3, required_fields = $4, updated_at = $5
         WHERE id = $1",
    )
    .bind(*doc_type.id.as_uuid())
    .bind(&doc_type.name)
    .bind(&doc_type.description)
    .bind(encode_fields(&doc_type.required_fields))
    .bind(*doc_type.updated_at.as_datetime())
    .execute(pool)
    .await
    .map_err(map_sqlx)?;

    Ok(result.rows_affected() > 0)
}

/// Insert by name, or update description and required fields when they differ.
///
/// The conditional `DO UPDATE` returns no row when nothing changed. On a
/// returned row, `xmax = 0` distinguishes a fresh insert from an update.
pub async fn upsert(
    pool: &PgPool,
    entry: &CatalogEntry,
    now: Timestamp,
) -> Result<UpsertOutcome, StoreError> {
    let inserted = sqlx::query_scalar::<_, bool>(
        "INSERT INTO document_types (id, name, description, required_fields, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $5)
         ON CONFLICT (name) DO UPDATE
         SET description = EXCLUDED.description,
             required_fields = EXCLUDED.required_fields,
             updated_at = EXCLUDED.updated_at
         WHERE document_types.description IS DISTINCT FROM EXCLUDED.description
            OR document_types.required_fields IS DISTINCT FROM EXCLUDED.required_fields
         RETURNING (xmax = 0) AS inserted",
    )
    .bind(Uuid::new_v4())
    .bind(&entry.name)
    .bind(&entry.description)
    .bind(encode_fields(&entry.required_fields))
    .bind(*now.as_datetime())
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx)?;

    Ok(match inserted {
        None => UpsertOutcome::Unchanged,
        Some(true) => UpsertOutcome::Created,
        Some(false) => UpsertOutcome::Updated,
    })
}

pub async fn delete_by_name(pool: &PgPool, name: &str) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM document_types WHERE name = $1")
        .bind(name)
        .execute(pool)
        .await
        .map_err(map_sqlx)?;

    Ok(result.rows_affected() > 0)
}

#[derive(sqlx::FromRow)]
struct DocumentTypeRow {
    id: Uuid,
    name: String,
    description: String,
    required_fields: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DocumentTypeRow {
    fn into_record(self) -> Result<DocumentType, StoreError> {
        let required_fields = self
            .required_fields
            .iter()
            .map(|raw| {
                RequiredField::parse(raw)
                    .ok_or_else(|| StoreError::Corrupt(format!("unknown required field {raw:?}")))
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(DocumentType {
            id: DocumentTypeId::from_uuid(self.id),
            name: self.name,
            description: self.description,
            required_fields,
            created_at: Timestamp::from_utc(self.created_at),
            updated_at: Timestamp::from_utc(self.updated_at),
        })
    }
}
