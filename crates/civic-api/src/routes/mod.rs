//! # API Route Modules
//!
//! | Prefix                  | Module               | Auth                         |
//! |-------------------------|----------------------|------------------------------|
//! | `/api/resident/*`       | [`resident`]         | none                         |
//! | `/api/document-types*`  | [`document_types`]   | GET none, writes admin       |
//! | `/api/files*`           | [`files`]            | none                         |
//! | `/api/admin/*`          | [`admin`]            | staff                        |
//! | `/api/admin/dashboard`  | [`analytics`]        | staff                        |
//! | `/api/analytics/*`      | [`analytics`]        | staff                        |

pub mod admin;
pub mod analytics;
pub mod document_types;
pub mod files;
pub mod resident;

use serde::Deserialize;

use crate::extractors::Validate;

/// Body of the status update endpoints. The value is parsed against the
/// entity's status enum by the handler.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

impl Validate for StatusUpdate {
    fn validate(&self) -> Result<(), String> {
        if self.status.trim().is_empty() {
            return Err("status must not be empty".into());
        }
        Ok(())
    }
}
