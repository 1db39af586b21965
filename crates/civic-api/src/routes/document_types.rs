//! # Document Type Catalog API
//!
//! Listing is public so the filing form can offer the choices. Creating and
//! editing types requires the `admin` role; only those method routes carry
//! the auth middleware.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use civic_core::DocumentTypeId;
use civic_state::{CatalogEntry, RequiredField};

use crate::auth::{auth_middleware, require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;
use crate::views::DocumentTypeView;

/// Body of the create and update endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTypeBody {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_fields: Vec<String>,
}

impl Validate for DocumentTypeBody {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        if let Some(unknown) = self
            .required_fields
            .iter()
            .find(|f| RequiredField::parse(f).is_none())
        {
            return Err(format!(
                "unknown required field {unknown:?}; expected eduAttainment or eduCourse"
            ));
        }
        Ok(())
    }
}

impl DocumentTypeBody {
    fn into_entry(self) -> CatalogEntry {
        CatalogEntry::new(
            self.name,
            self.description,
            self.required_fields
                .iter()
                .filter_map(|f| RequiredField::parse(f)),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentTypeList {
    #[serde(rename = "docTypes")]
    pub doc_types: Vec<DocumentTypeView>,
}

#[derive(Debug, Serialize)]
pub struct DocumentTypeMessage {
    pub message: &'static str,
    #[serde(rename = "docType")]
    pub doc_type: DocumentTypeView,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/document-types",
            get(list_document_types)
                .merge(post(create_document_type).layer(from_fn(auth_middleware))),
        )
        .route(
            "/api/document-types/{id}",
            put(update_document_type).layer(from_fn(auth_middleware)),
        )
}

/// GET /api/document-types: The catalog, ordered by name.
async fn list_document_types(
    State(state): State<AppState>,
) -> Result<Json<DocumentTypeList>, AppError> {
    let doc_types = state.service.list_document_types().await?;
    Ok(Json(DocumentTypeList {
        doc_types: doc_types.into_iter().map(DocumentTypeView::from).collect(),
    }))
}

/// POST /api/document-types
async fn create_document_type(
    caller: CallerIdentity,
    State(state): State<AppState>,
    body: Result<Json<DocumentTypeBody>, JsonRejection>,
) -> Result<(StatusCode, Json<DocumentTypeMessage>), AppError> {
    require_role(&caller, Role::Admin)?;
    let body = extract_validated_json(body)?;
    let doc_type = state
        .service
        .create_document_type(body.into_entry())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(DocumentTypeMessage {
            message: "Document type created",
            doc_type: doc_type.into(),
        }),
    ))
}

/// PUT /api/document-types/{id}
async fn update_document_type(
    caller: CallerIdentity,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<DocumentTypeBody>, JsonRejection>,
) -> Result<Json<DocumentTypeMessage>, AppError> {
    require_role(&caller, Role::Admin)?;
    let body = extract_validated_json(body)?;
    let doc_type = state
        .service
        .update_document_type(DocumentTypeId::from_uuid(id), body.into_entry())
        .await?;
    Ok(Json(DocumentTypeMessage {
        message: "Document type updated",
        doc_type: doc_type.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(name: &str, fields: &[&str]) -> DocumentTypeBody {
        DocumentTypeBody {
            name: name.into(),
            description: String::new(),
            required_fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn rejects_unknown_required_field() {
        let err = body("Cedula", &["eduAttainment", "height"]).validate().unwrap_err();
        assert!(err.contains("height"));
    }

    #[test]
    fn rejects_blank_name() {
        assert!(body("  ", &[]).validate().is_err());
    }

    #[test]
    fn converts_to_catalog_entry() {
        let entry = body("Job Seeker", &["eduCourse", "eduCourse"]).into_entry();
        assert_eq!(entry.required_fields.len(), 1);
        assert!(entry.required_fields.contains(&RequiredField::EduCourse));
    }
}
