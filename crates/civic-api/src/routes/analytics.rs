//! # Dashboard & Analytics API
//!
//! Read-only counts for staff. The weekly endpoints cover the seven days
//! ending now, grouped per civic-local day.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use civic_core::Timestamp;

use crate::analytics::DashboardStats;
use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::state::AppState;
use crate::views::{ComplaintDayView, RequestDayView};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    pub request_stats: Vec<RequestDayView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintStats {
    pub complaint_stats: Vec<ComplaintDayView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllAnalytics {
    pub request_stats: Vec<RequestDayView>,
    pub complaint_stats: Vec<ComplaintDayView>,
    pub summary: DashboardStats,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/dashboard", get(dashboard))
        .route("/api/analytics/weekly-requests", get(weekly_requests))
        .route(
            "/api/analytics/complaint-resolution",
            get(complaint_resolution),
        )
        .route("/api/analytics/all", get(all_analytics))
}

/// GET /api/admin/dashboard: Totals and per-status counts.
async fn dashboard(
    caller: CallerIdentity,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, AppError> {
    require_role(&caller, Role::Staff)?;
    Ok(Json(state.service.dashboard().await?))
}

/// GET /api/analytics/weekly-requests
async fn weekly_requests(
    caller: CallerIdentity,
    State(state): State<AppState>,
) -> Result<Json<RequestStats>, AppError> {
    require_role(&caller, Role::Staff)?;
    let days = state.service.weekly_requests(Timestamp::now()).await?;
    Ok(Json(RequestStats {
        request_stats: days.into_iter().map(RequestDayView::from).collect(),
    }))
}

/// GET /api/analytics/complaint-resolution
async fn complaint_resolution(
    caller: CallerIdentity,
    State(state): State<AppState>,
) -> Result<Json<ComplaintStats>, AppError> {
    require_role(&caller, Role::Staff)?;
    let days = state.service.weekly_complaints(Timestamp::now()).await?;
    Ok(Json(ComplaintStats {
        complaint_stats: days.into_iter().map(ComplaintDayView::from).collect(),
    }))
}

/// GET /api/analytics/all: Both weekly breakdowns plus the dashboard counts.
async fn all_analytics(
    caller: CallerIdentity,
    State(state): State<AppState>,
) -> Result<Json<AllAnalytics>, AppError> {
    require_role(&caller, Role::Staff)?;
    let now = Timestamp::now();
    let requests = state.service.weekly_requests(now).await?;
    let complaints = state.service.weekly_complaints(now).await?;
    let summary = state.service.dashboard().await?;
    Ok(Json(AllAnalytics {
        request_stats: requests.into_iter().map(RequestDayView::from).collect(),
        complaint_stats: complaints.into_iter().map(ComplaintDayView::from).collect(),
        summary,
    }))
}
