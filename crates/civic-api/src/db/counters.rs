//! Reference counter rows, one per (kind, year, month) bucket.

use sqlx::PgPool;

use civic_core::Bucket;

use super::map_sqlx;
use crate::store::StoreError;

fn sequence_from_row(value: i32) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative sequence {value}")))
}

/// Increment the bucket's counter, creating it at 1, and return the new value.
pub async fn increment(pool: &PgPool, bucket: Bucket) -> Result<u32, StoreError> {
    let last: i32 = sqlx::query_scalar(
        "INSERT INTO reference_counters (kind, year, month, last_seq)
         VALUES ($1, $2, $3, 1)
         ON CONFLICT (kind, year, month)
         DO UPDATE SET last_seq = reference_counters.last_seq + 1
         RETURNING last_seq",
    )
    .bind(bucket.kind().as_str())
    .bind(bucket.year())
    .bind(bucket.month() as i32)
    .fetch_one(pool)
    .await
    .map_err(map_sqlx)?;

    sequence_from_row(last)
}

/// Last issued sequence, 0 when the bucket has no row yet.
pub async fn current(pool: &PgPool, bucket: Bucket) -> Result<u32, StoreError> {
    let last: Option<i32> = sqlx::query_scalar(
        "SELECT last_seq FROM reference_counters WHERE kind = $1 AND year = $2 AND month = $3",
    )
    .bind(bucket.kind().as_str())
    .bind(bucket.year())
    .bind(bucket.month() as i32)
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx)?;

    last.map(sequence_from_row).transpose().map(|s| s.unwrap_or(0))
}
