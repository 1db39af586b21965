//! Aggregate queries behind the dashboard and the weekly analytics.
//!
//! Days are civic-local calendar days: `created_at` is shifted by the civic
//! offset before truncation, matching how bucketing reads the month.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use civic_core::{civic_offset, Timestamp};
use civic_state::{ComplaintStatus, LifecycleStatus, RequestStatus};

use super::{decode_status, map_sqlx};
use crate::store::{DailyCount, StatusCount, StoreError};

const REQUEST_STATUS_COUNTS: &str =
    "SELECT status, COUNT(*) FROM document_requests GROUP BY status";

const COMPLAINT_STATUS_COUNTS: &str = "SELECT status, COUNT(*) FROM complaints GROUP BY status";

const DAILY_REQUESTS_BY_DOC_TYPE: &str = r#"
    SELECT ((r.created_at AT TIME ZONE 'UTC') + $2::integer * INTERVAL '1 second')::date AS day,
           d.name AS doc_type,
           COUNT(*) AS count
    FROM document_requests r
    LEFT JOIN document_types d ON d.id = r.doc_type_id
    WHERE r.created_at >= $1
    GROUP BY 1, 2
"#;

const DAILY_COMPLAINTS_BY_STATUS: &str = r#"
    SELECT ((created_at AT TIME ZONE 'UTC') + $2::integer * INTERVAL '1 second')::date AS day,
           status,
           COUNT(*) AS count
    FROM complaints
    WHERE created_at >= $1
    GROUP BY 1, 2
"#;

fn decode_count(raw: i64) -> Result<u64, StoreError> {
    u64::try_from(raw).map_err(|_| StoreError::Corrupt(format!("negative count {raw}")))
}

fn offset_seconds() -> i32 {
    // The civic offset is a whole number of hours.
    civic_offset().num_seconds() as i32
}

async fn status_counts<S: LifecycleStatus + Ord>(
    pool: &PgPool,
    sql: &'static str,
) -> Result<Vec<StatusCount<S>>, StoreError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(sql)
        .fetch_all(pool)
        .await
        .map_err(map_sqlx)?;

    let mut counts = rows
        .into_iter()
        .map(|(status, count)| {
            Ok(StatusCount {
                status: decode_status::<S>(&status)?,
                count: decode_count(count)?,
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    counts.sort_by_key(|c| c.status);
    Ok(counts)
}

pub async fn request_status_counts(
    pool: &PgPool,
) -> Result<Vec<StatusCount<RequestStatus>>, StoreError> {
    status_counts(pool, REQUEST_STATUS_COUNTS).await
}

pub async fn complaint_status_counts(
    pool: &PgPool,
) -> Result<Vec<StatusCount<ComplaintStatus>>, StoreError> {
    status_counts(pool, COMPLAINT_STATUS_COUNTS).await
}

pub async fn daily_requests(
    pool: &PgPool,
    since: Timestamp,
) -> Result<Vec<DailyCount<Option<String>>>, StoreError> {
    let since: DateTime<Utc> = *since.as_datetime();
    let rows: Vec<(NaiveDate, Option<String>, i64)> = sqlx::query_as(DAILY_REQUESTS_BY_DOC_TYPE)
        .bind(since)
        .bind(offset_seconds())
        .fetch_all(pool)
        .await
        .map_err(map_sqlx)?;

    let mut counts = rows
        .into_iter()
        .map(|(day, doc_type, count)| {
            Ok(DailyCount {
                day,
                key: doc_type,
                count: decode_count(count)?,
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    // Byte order on names, independent of the database collation.
    counts.sort_by(|a, b| (a.day, &a.key).cmp(&(b.day, &b.key)));
    Ok(counts)
}

pub async fn daily_complaints(
    pool: &PgPool,
    since: Timestamp,
) -> Result<Vec<DailyCount<ComplaintStatus>>, StoreError> {
    let since: DateTime<Utc> = *since.as_datetime();
    let rows: Vec<(NaiveDate, String, i64)> = sqlx::query_as(DAILY_COMPLAINTS_BY_STATUS)
        .bind(since)
        .bind(offset_seconds())
        .fetch_all(pool)
        .await
        .map_err(map_sqlx)?;

    let mut counts = rows
        .into_iter()
        .map(|(day, status, count)| {
            Ok(DailyCount {
                day,
                key: decode_status::<ComplaintStatus>(&status)?,
                count: decode_count(count)?,
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    counts.sort_by_key(|c| (c.day, c.key));
    Ok(counts)
}
