//! # civic-state — Lifecycle State Machines
//!
//! Domain state for the civic services stack.
//!
//! - **Request** (`request.rs`): `pending → approved | rejected`. Entering
//!   either decision stamps `approvedBy` / `approvedAt`.
//! - **Complaint** (`complaint.rs`): `pending → in_progress → resolved`, with
//!   `pending → resolved` allowed directly. Resolving stamps `processedBy` /
//!   `resolvedAt`.
//! - **Catalog** (`catalog.rs`): document types and the seed catalog.
//! - **Intake** (`intake.rs`): applicant and complaint validation, producing
//!   the verified tokens the entity constructors require.
//!
//! ## Design
//!
//! Both status enums implement [`LifecycleStatus`], which declares the
//! transition graph as a table of allowed sources per target. A transition to
//! the current status is an idempotent no-op, every other edge outside the
//! table is an [`LifecycleError::IllegalTransition`]. Audit fields are
//! write-once. Entities are plain data; persistence is the caller's concern.

pub mod catalog;
pub mod complaint;
pub mod intake;
pub mod lifecycle;
pub mod request;

pub use catalog::{
    Catalog, CatalogEntry, CatalogError, DocumentType, RequiredField, LEGACY_DOCUMENT_TYPES,
};
pub use complaint::{Complaint, ComplaintStatus};
pub use intake::{
    Applicant, ComplaintDetails, IntakeError, VerifiedApplication, VerifiedComplaint, MAX_AGE,
};
pub use lifecycle::{
    check_transition, parse_status, LifecycleError, LifecycleStatus, TransitionOutcome,
    TransitionRecord,
};
pub use request::{DocumentRequest, RequestStatus};
