//! # Resident API
//!
//! Unauthenticated filing and status lookup.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use civic_core::{ActorId, BlobId, DocumentTypeId, Reference};
use civic_state::Applicant;

use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::service::NewRequest;
use crate::state::AppState;
use crate::views::RequestView;

/// Body of `POST /api/resident/request`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRequestBody {
    #[serde(flatten)]
    pub applicant: Applicant,
    pub doc_type_id: Uuid,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub uploaded_file_id: Option<Uuid>,
}

impl FileRequestBody {
    fn into_new_request(self) -> Result<NewRequest, AppError> {
        let user_id = self
            .user_id
            .filter(|u| !u.trim().is_empty())
            .map(ActorId::new)
            .transpose()?;
        Ok(NewRequest {
            applicant: self.applicant,
            doc_type_id: DocumentTypeId::from_uuid(self.doc_type_id),
            user_id,
            uploaded_file_id: self.uploaded_file_id.map(BlobId::from_uuid),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct FiledResponse {
    pub message: &'static str,
    pub request: RequestView,
    #[serde(rename = "ref")]
    pub reference: Reference,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "ref")]
    pub reference: String,
}

#[derive(Debug, Serialize)]
pub struct RequestEnvelope {
    pub request: RequestView,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/resident/request", post(file_request))
        .route("/api/resident/request/status", get(request_status))
}

/// POST /api/resident/request: File a document request.
async fn file_request(
    State(state): State<AppState>,
    body: Result<Json<FileRequestBody>, JsonRejection>,
) -> Result<(StatusCode, Json<FiledResponse>), AppError> {
    let new = extract_json(body)?.into_new_request()?;
    let request = state.service.file_request(new).await?;
    let reference = request.reference;
    Ok((
        StatusCode::CREATED,
        Json(FiledResponse {
            message: "Request filed successfully",
            request: request.into(),
            reference,
        }),
    ))
}

/// GET /api/resident/request/status?ref=REQ-YYYY-MM-NNNNN: Look up by reference.
async fn request_status(
    State(state): State<AppState>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<RequestEnvelope>, AppError> {
    let query = extract_query(query)?;
    let request = state.service.request_status(&query.reference).await?;
    Ok(Json(RequestEnvelope {
        request: request.into(),
    }))
}
