//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error taxonomy shared by every layer of the civic stack.
//! All errors use `thiserror` for derive-based `Display` and `Error`.
//!
//! ## Design
//!
//! - Validation errors are the caller's fault and are never retried.
//! - Conflicts cover both duplicate references that exhausted the retry
//!   budget and illegal lifecycle transitions.
//! - Storage faults are transient; the allocator retries them with a bounded
//!   budget, every other caller surfaces them.

use thiserror::Error;

/// Top-level error type for the civic services core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CivicError {
    /// Missing or malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Referenced entity or document type does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate reference after retries, or an illegal state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The actor lacks the role required for the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The backing store could not be reached.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

/// Coarse classification of a [`CivicError`], used for retry decisions and
/// metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unauthorized,
    StorageUnavailable,
}

impl ErrorKind {
    /// Stable snake_case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Unauthorized => "unauthorized",
            Self::StorageUnavailable => "storage_unavailable",
        }
    }
}

impl CivicError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
        }
    }

    /// Whether a bounded retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

impl From<crate::reference::ReferenceError> for CivicError {
    fn from(err: crate::reference::ReferenceError) -> Self {
        match err {
            crate::reference::ReferenceError::BucketExhausted { .. } => {
                Self::Conflict(err.to_string())
            }
            _ => Self::Validation(err.to_string()),
        }
    }
}
