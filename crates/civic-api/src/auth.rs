//! # Authentication & Authorization Middleware
//!
//! Bearer token middleware with role-based access control.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {role}:{actor_id}:{secret}   role-scoped token
//! Bearer {secret}                     bare secret (treated as admin)
//! ```
//!
//! `actor_id` is recorded verbatim in audit fields (`approvedBy`,
//! `processedBy`). When it is empty the role name is used.
//!
//! ## CallerIdentity
//!
//! The middleware injects a [`CallerIdentity`] into request extensions.
//! Handlers extract it via the `FromRequestParts` impl and check the role
//! with [`require_role`].

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use civic_core::ActorId;

use crate::error::{AppError, ErrorBody, ErrorDetail};

// ── Role ────────────────────────────────────────────────────────────────────

/// Roles ordered by privilege: `Resident < Staff < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Files requests and checks their status.
    Resident,
    /// Reviews requests and handles complaints.
    Staff,
    /// Staff privileges plus catalog management.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resident => "resident",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "resident" => Some(Self::Resident),
            "staff" => Some(Self::Staff),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub role: Role,
    /// Recorded in audit fields when this caller changes a status.
    pub actor: ActorId,
}

impl CallerIdentity {
    /// Identity injected when authentication is disabled.
    pub fn anonymous_admin() -> Result<Self, AppError> {
        Ok(Self {
            role: Role::Admin,
            actor: ActorId::new("anonymous").map_err(|e| AppError::Internal(e.to_string()))?,
        })
    }

    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller has at least the required role (403 otherwise).
pub fn require_role(caller: &CallerIdentity, minimum: Role) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer secrets.
///
/// When lengths differ a dummy comparison still runs so the timing does not
/// depend on which check failed.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse `{role}:{actor_id}:{secret}` or a bare `{secret}`.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();

    match parts.as_slice() {
        [secret] => {
            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }
            let actor = ActorId::new(Role::Admin.as_str()).map_err(|e| e.to_string())?;
            Ok(CallerIdentity {
                role: Role::Admin,
                actor,
            })
        }
        [role_str, actor_str, secret] => {
            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }
            let role = Role::parse(role_str).ok_or_else(|| format!("unknown role: {role_str}"))?;
            let actor = if actor_str.is_empty() {
                ActorId::new(role.as_str())
            } else {
                ActorId::new(*actor_str)
            }
            .map_err(|e| format!("invalid actor id: {e}"))?;
            Ok(CallerIdentity { role, actor })
        }
        _ => Err("invalid token format; expected {role}:{actor_id}:{secret} or {secret}".into()),
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the Bearer token and inject the caller's [`CallerIdentity`].
///
/// When `AuthConfig.token` is `None`, every request runs as an anonymous
/// admin (authentication disabled).
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected_token = request.extensions().get::<AuthConfig>().cloned();

    match expected_token {
        Some(AuthConfig {
            token: Some(ref expected),
        }) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header {
                Some(header_value) if header_value.starts_with("Bearer ") => {
                    let provided = &header_value[7..];
                    match parse_bearer_token(provided, expected) {
                        Ok(identity) => {
                            request.extensions_mut().insert(identity);
                            next.run(request).await
                        }
                        Err(msg) => {
                            tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                            unauthorized_response(&msg)
                        }
                    }
                }
                Some(_) => {
                    tracing::warn!("authentication failed: non-Bearer authorization scheme");
                    unauthorized_response("authorization header must use Bearer scheme")
                }
                None => {
                    tracing::warn!("authentication failed: missing authorization header");
                    unauthorized_response("missing authorization header")
                }
            }
        }
        _ => match CallerIdentity::anonymous_admin() {
            Ok(identity) => {
                request.extensions_mut().insert(identity);
                next.run(request).await
            }
            Err(err) => err.into_response(),
        },
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app(token: Option<String>) -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|caller: CallerIdentity| async move {
                    format!("{}:{}", caller.role.as_str(), caller.actor)
                }),
            )
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(AuthConfig { token }))
    }

    async fn call(app: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn staff_token_carries_actor() {
        let app = test_app(Some("s3cret".into()));
        let (status, body) = call(app, Some("Bearer staff:maria:s3cret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "staff:maria");
    }

    #[tokio::test]
    async fn bare_secret_is_admin() {
        let app = test_app(Some("s3cret".into()));
        let (status, body) = call(app, Some("Bearer s3cret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "admin:admin");
    }

    #[tokio::test]
    async fn missing_header_rejected() {
        let app = test_app(Some("s3cret".into()));
        let (status, body) = call(app, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let err: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(err["error"]["code"], "UNAUTHORIZED");
        assert!(err["error"]["message"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn wrong_secret_rejected() {
        let app = test_app(Some("s3cret".into()));
        let (status, _) = call(app, Some("Bearer staff:maria:nope")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn basic_scheme_rejected() {
        let app = test_app(Some("s3cret".into()));
        let (status, body) = call(app, Some("Basic dXNlcjpwYXNz")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Bearer scheme"));
    }

    #[tokio::test]
    async fn disabled_auth_is_anonymous_admin() {
        let app = test_app(None);
        let (status, body) = call(app, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "admin:anonymous");
    }

    #[test]
    fn role_ordering() {
        assert!(Role::Resident < Role::Staff);
        assert!(Role::Staff < Role::Admin);
    }

    #[test]
    fn empty_actor_defaults_to_role_name() {
        let identity = parse_bearer_token("staff::s3cret", "s3cret").unwrap();
        assert_eq!(identity.actor.as_str(), "staff");
    }

    #[test]
    fn unknown_role_rejected() {
        let err = parse_bearer_token("mayor:x:s3cret", "s3cret").unwrap_err();
        assert!(err.contains("unknown role"));
    }

    #[test]
    fn two_part_token_rejected() {
        assert!(parse_bearer_token("staff:s3cret", "s3cret").is_err());
    }

    #[test]
    fn require_role_enforces_minimum() {
        let resident = CallerIdentity {
            role: Role::Resident,
            actor: ActorId::new("juan").unwrap(),
        };
        assert!(matches!(
            require_role(&resident, Role::Staff),
            Err(AppError::Forbidden(_))
        ));
        let admin = CallerIdentity {
            role: Role::Admin,
            actor: ActorId::new("root").unwrap(),
        };
        assert!(require_role(&admin, Role::Staff).is_ok());
    }

    #[test]
    fn constant_time_eq_rejects_prefix() {
        assert!(constant_time_token_eq("s3cret", "s3cret"));
        assert!(!constant_time_token_eq("s3c", "s3cret"));
        assert!(!constant_time_token_eq("", "s3cret"));
    }
}
