//! # civic-api — Axum API Services for the Civic Services Stack
//!
//! Residents file document requests and look up their status by reference
//! code; staff review requests and encode complaints; admins maintain the
//! document type catalog.
//!
//! ## API Surface
//!
//! | Prefix                  | Module                        | Auth              |
//! |-------------------------|-------------------------------|-------------------|
//! | `/`                     | banner                        | none              |
//! | `/health/*`             | liveness / readiness checks   | none              |
//! | `/api/resident/*`       | [`routes::resident`]          | none              |
//! | `/api/document-types*`  | [`routes::document_types`]    | writes: admin     |
//! | `/api/files*`           | [`routes::files`]             | none              |
//! | `/api/admin/*`          | [`routes::admin`]             | staff             |
//! | `/api/admin/dashboard`  | [`routes::analytics`]         | staff             |
//! | `/api/analytics/*`      | [`routes::analytics`]         | staff             |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! Extension(AuthConfig) → CORS → TraceLayer → Metrics → [Auth] → Handler
//! ```
//!
//! Auth is attached only to the admin and analytics routers and to the
//! document type write methods. Unmatched paths fall back to a JSON 404.

pub mod allocator;
pub mod analytics;
pub mod auth;
pub mod blob;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod lifecycle;
pub mod middleware;
pub mod routes;
pub mod seed;
pub mod service;
pub mod state;
pub mod store;
pub mod views;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct Banner {
    message: &'static str,
}

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let staff = routes::admin::router()
        .merge(routes::analytics::router())
        .layer(from_fn(auth::auth_middleware));

    let public = Router::new()
        .route("/", get(banner))
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .merge(routes::resident::router())
        .merge(routes::document_types::router())
        .merge(routes::files::router());

    Router::new()
        .merge(public)
        .merge(staff)
        .fallback(not_found)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(Extension(auth_config))
        .with_state(state)
}

/// GET /: Service banner.
async fn banner() -> Json<Banner> {
    Json(Banner {
        message: "Civic services API is running",
    })
}

/// Unmatched paths get the same error envelope as every other failure.
async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}

/// Liveness check. Always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check: 200 "ready" once the store answers, 503 otherwise.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.ping().await {
        Ok(()) => (StatusCode::OK, "ready").into_response(),
        Err(e) => {
            tracing::warn!("store health check failed: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "store unreachable").into_response()
        }
    }
}
