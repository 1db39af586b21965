//! # Staff Dashboard API
//!
//! Review of document requests and handling of complaints. Every handler
//! requires at least the `staff` role; the acting staff member's id is
//! recorded in the audit fields of any status change.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;

use civic_core::{ComplaintId, Reference, RequestId};
use civic_state::{ComplaintDetails, ComplaintStatus, RequestStatus};

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json};
use crate::routes::StatusUpdate;
use crate::state::AppState;
use crate::views::{ComplaintView, RequestView};

#[derive(Debug, Serialize)]
pub struct RequestList {
    pub requests: Vec<RequestView>,
}

#[derive(Debug, Serialize)]
pub struct RequestEnvelope {
    pub request: RequestView,
}

#[derive(Debug, Serialize)]
pub struct RequestMessage {
    pub message: &'static str,
    pub request: RequestView,
}

#[derive(Debug, Serialize)]
pub struct ComplaintList {
    pub complaints: Vec<ComplaintView>,
}

#[derive(Debug, Serialize)]
pub struct ComplaintEnvelope {
    pub complaint: ComplaintView,
}

#[derive(Debug, Serialize)]
pub struct ComplaintMessage {
    pub message: &'static str,
    pub complaint: ComplaintView,
}

#[derive(Debug, Serialize)]
pub struct ComplaintFiled {
    pub message: &'static str,
    pub complaint: ComplaintView,
    #[serde(rename = "ref")]
    pub reference: Reference,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/requests", get(list_requests))
        .route(
            "/api/admin/requests/{id}",
            get(get_request).delete(delete_request),
        )
        .route(
            "/api/admin/requests/{id}/status",
            put(update_request_status),
        )
        .route(
            "/api/admin/complaints",
            get(list_complaints).post(create_complaint),
        )
        .route(
            "/api/admin/complaints/{id}",
            get(get_complaint).delete(delete_complaint),
        )
        .route(
            "/api/admin/complaints/{id}/status",
            put(update_complaint_status),
        )
}

// ── Document requests ───────────────────────────────────────────────

/// GET /api/admin/requests: All requests, newest first.
async fn list_requests(
    caller: CallerIdentity,
    State(state): State<AppState>,
) -> Result<Json<RequestList>, AppError> {
    require_role(&caller, Role::Staff)?;
    let requests = state.service.list_requests().await?;
    Ok(Json(RequestList {
        requests: requests.into_iter().map(RequestView::from).collect(),
    }))
}

/// GET /api/admin/requests/{id}
async fn get_request(
    caller: CallerIdentity,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RequestEnvelope>, AppError> {
    require_role(&caller, Role::Staff)?;
    let request = state.service.get_request(RequestId::from_uuid(id)).await?;
    Ok(Json(RequestEnvelope {
        request: request.into(),
    }))
}

/// PUT /api/admin/requests/{id}/status: Approve or reject.
async fn update_request_status(
    caller: CallerIdentity,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<RequestMessage>, AppError> {
    require_role(&caller, Role::Staff)?;
    let update = extract_validated_json(body)?;
    let target: RequestStatus = update.status.trim().parse()?;
    let request = state
        .service
        .transition_request(RequestId::from_uuid(id), target, &caller.actor)
        .await?;
    Ok(Json(RequestMessage {
        message: "Request status updated",
        request: request.into(),
    }))
}

/// DELETE /api/admin/requests/{id}
async fn delete_request(
    caller: CallerIdentity,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RequestMessage>, AppError> {
    require_role(&caller, Role::Staff)?;
    let request = state.service.delete_request(RequestId::from_uuid(id)).await?;
    Ok(Json(RequestMessage {
        message: "Request deleted successfully",
        request: request.into(),
    }))
}

// ── Complaints ──────────────────────────────────────────────────────

/// POST /api/admin/complaints: Encode a complaint received at the desk.
async fn create_complaint(
    caller: CallerIdentity,
    State(state): State<AppState>,
    body: Result<Json<ComplaintDetails>, JsonRejection>,
) -> Result<(StatusCode, Json<ComplaintFiled>), AppError> {
    require_role(&caller, Role::Staff)?;
    let details = extract_json(body)?;
    let complaint = state.service.open_complaint(details).await?;
    let reference = complaint.reference;
    Ok((
        StatusCode::CREATED,
        Json(ComplaintFiled {
            message: "Complaint encoded successfully",
            complaint: complaint.into(),
            reference,
        }),
    ))
}

/// GET /api/admin/complaints: All complaints, newest first.
async fn list_complaints(
    caller: CallerIdentity,
    State(state): State<AppState>,
) -> Result<Json<ComplaintList>, AppError> {
    require_role(&caller, Role::Staff)?;
    let complaints = state.service.list_complaints().await?;
    Ok(Json(ComplaintList {
        complaints: complaints.into_iter().map(ComplaintView::from).collect(),
    }))
}

/// GET /api/admin/complaints/{id}
async fn get_complaint(
    caller: CallerIdentity,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ComplaintEnvelope>, AppError> {
    require_role(&caller, Role::Staff)?;
    let complaint = state.service.get_complaint(ComplaintId::from_uuid(id)).await?;
    Ok(Json(ComplaintEnvelope {
        complaint: complaint.into(),
    }))
}

/// PUT /api/admin/complaints/{id}/status: Start or resolve.
async fn update_complaint_status(
    caller: CallerIdentity,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<ComplaintMessage>, AppError> {
    require_role(&caller, Role::Staff)?;
    let update = extract_validated_json(body)?;
    let target: ComplaintStatus = update.status.trim().parse()?;
    let complaint = state
        .service
        .transition_complaint(ComplaintId::from_uuid(id), target, &caller.actor)
        .await?;
    Ok(Json(ComplaintMessage {
        message: "Complaint status updated",
        complaint: complaint.into(),
    }))
}

/// DELETE /api/admin/complaints/{id}
async fn delete_complaint(
    caller: CallerIdentity,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ComplaintMessage>, AppError> {
    require_role(&caller, Role::Staff)?;
    let complaint = state
        .service
        .delete_complaint(ComplaintId::from_uuid(id))
        .await?;
    Ok(Json(ComplaintMessage {
        message: "Complaint deleted successfully",
        complaint: complaint.into(),
    }))
}
