//! # File API
//!
//! Stores ID images attached to document requests. The body of
//! `POST /api/files` is the raw image; its media type comes from the
//! `Content-Type` header.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;

use civic_core::BlobId;

use crate::blob::{blob_url, Blob, MAX_BLOB_BYTES};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file_id: Uuid,
    pub url: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/files",
            post(upload_file).layer(DefaultBodyLimit::max(MAX_BLOB_BYTES)),
        )
        .route("/api/files/{id}", get(download_file))
}

fn image_content_type(headers: &HeaderMap) -> Result<String, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
        .ok_or_else(|| AppError::Validation("Content-Type header is required".into()))?;
    if !content_type.starts_with("image/") {
        return Err(AppError::Validation(format!(
            "only image uploads are accepted, got {content_type}"
        )));
    }
    Ok(content_type)
}

/// POST /api/files: Store an image, returning its id and download path.
async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadedFile>), AppError> {
    let content_type = image_content_type(&headers)?;
    if body.is_empty() {
        return Err(AppError::Validation("uploaded file is empty".into()));
    }
    let id = state
        .service
        .upload_blob(Blob {
            content_type,
            bytes: body.to_vec(),
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(UploadedFile {
            file_id: *id.as_uuid(),
            url: blob_url(id),
        }),
    ))
}

/// GET /api/files/{id}
async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let blob = state.service.get_blob(BlobId::from_uuid(id)).await?;
    let content_type = HeaderValue::from_str(&blob.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    Ok(([(header::CONTENT_TYPE, content_type)], blob.bytes).into_response())
}
