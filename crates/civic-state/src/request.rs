//! # Document Request Lifecycle
//!
//! ```text
//!            ┌──▶ approved  (terminal)
//! pending ───┤
//!            └──▶ rejected  (terminal)
//! ```
//!
//! Entering either terminal status stamps `approvedBy` / `approvedAt`. The
//! field name is historical: it records the reviewer for rejections too.

use serde::{Deserialize, Serialize};

use civic_core::{ActorId, BlobId, DocumentTypeId, Reference, RequestId, Timestamp};

use crate::intake::{Applicant, VerifiedApplication};
use crate::lifecycle::{
    check_transition, parse_status, stamp_audit, LifecycleError, LifecycleStatus,
    TransitionOutcome, TransitionRecord,
};

/// Review status of a document request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Filed, awaiting review.
    Pending,
    /// Approved by staff.
    Approved,
    /// Rejected by staff.
    Rejected,
}

impl LifecycleStatus for RequestStatus {
    const ENTITY: &'static str = "request";
    const INITIAL: Self = Self::Pending;

    fn all() -> &'static [Self] {
        &[Self::Pending, Self::Approved, Self::Rejected]
    }

    fn allowed_sources(target: Self) -> &'static [Self] {
        match target {
            Self::Pending => &[],
            Self::Approved | Self::Rejected => &[Self::Pending],
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    fn is_audit_bearing(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s)
    }
}

/// A resident's request for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequest {
    pub id: RequestId,
    /// Issued at filing; never changes.
    #[serde(rename = "ref")]
    pub reference: Reference,
    /// Account that filed the request, when the resident was signed in.
    #[serde(default)]
    pub user_id: Option<ActorId>,
    #[serde(flatten)]
    pub applicant: Applicant,
    pub doc_type_id: DocumentTypeId,
    #[serde(default)]
    pub uploaded_file_id: Option<BlobId>,
    pub status: RequestStatus,
    #[serde(default)]
    pub approved_by: Option<ActorId>,
    #[serde(default)]
    pub approved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub transitions: Vec<TransitionRecord<RequestStatus>>,
}

impl DocumentRequest {
    /// File a new request in the `pending` status.
    pub fn file(
        reference: Reference,
        application: VerifiedApplication,
        user_id: Option<ActorId>,
        uploaded_file_id: Option<BlobId>,
        now: Timestamp,
    ) -> Self {
        let (applicant, doc_type_id) = application.into_parts();
        Self {
            id: RequestId::new(),
            reference,
            user_id,
            applicant,
            doc_type_id,
            uploaded_file_id,
            status: RequestStatus::INITIAL,
            approved_by: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
            transitions: Vec::new(),
        }
    }

    /// Move to `target`, stamping the reviewer when a decision is recorded.
    ///
    /// A transition to the current status returns
    /// [`TransitionOutcome::Unchanged`] and modifies nothing.
    pub fn transition(
        &mut self,
        target: RequestStatus,
        actor: &ActorId,
        now: Timestamp,
    ) -> Result<TransitionOutcome<RequestStatus>, LifecycleError> {
        let outcome = check_transition(self.status, target)?;
        if let TransitionOutcome::Applied { from, to } = outcome {
            self.status = to;
            if to.is_audit_bearing() {
                stamp_audit(&mut self.approved_by, &mut self.approved_at, actor, now);
            }
            self.updated_at = now;
            self.transitions.push(TransitionRecord {
                from,
                to,
                actor: actor.clone(),
                at: now,
            });
        }
        Ok(outcome)
    }

    pub fn is_decided(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogEntry, DocumentType};
    use civic_core::{Bucket, RefKind};

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn staff() -> ActorId {
        ActorId::new("staff-1").unwrap()
    }

    fn make_request() -> DocumentRequest {
        let dt = DocumentType::from_entry(
            &CatalogEntry::new("Barangay Clearance", "", []),
            ts("2025-01-01T00:00:00Z"),
        );
        let applicant = Applicant {
            full_name: "Ana Santos".into(),
            contact_number: "0917".into(),
            address: "San Jose".into(),
            purpose: "Employment".into(),
            age: 30,
            marital_status: None,
            edu_attainment: None,
            edu_course: None,
        };
        let reference = Bucket::new(RefKind::Request, 2025, 1)
            .unwrap()
            .reference(1)
            .unwrap();
        DocumentRequest::file(
            reference,
            applicant.verify_for(&dt).unwrap(),
            None,
            None,
            ts("2025-01-15T10:00:00Z"),
        )
    }

    #[test]
    fn new_request_is_pending_without_audit() {
        let r = make_request();
        assert_eq!(r.status, RequestStatus::Pending);
        assert!(r.approved_by.is_none());
        assert!(r.approved_at.is_none());
        assert!(r.transitions.is_empty());
    }

    #[test]
    fn approve_stamps_reviewer() {
        let mut r = make_request();
        let now = ts("2025-01-16T02:00:00Z");
        let outcome = r.transition(RequestStatus::Approved, &staff(), now).unwrap();
        assert!(outcome.is_applied());
        assert_eq!(r.status, RequestStatus::Approved);
        assert_eq!(r.approved_by, Some(staff()));
        assert_eq!(r.approved_at, Some(now));
        assert_eq!(r.updated_at, now);
        assert_eq!(r.transitions.len(), 1);
    }

    #[test]
    fn reject_also_stamps_reviewer() {
        let mut r = make_request();
        r.transition(RequestStatus::Rejected, &staff(), ts("2025-01-16T02:00:00Z"))
            .unwrap();
        assert_eq!(r.approved_by, Some(staff()));
        assert!(r.is_decided());
    }

    #[test]
    fn approved_cannot_return_to_pending() {
        let mut r = make_request();
        r.transition(RequestStatus::Approved, &staff(), ts("2025-01-16T02:00:00Z"))
            .unwrap();
        let err = r
            .transition(RequestStatus::Pending, &staff(), ts("2025-01-17T02:00:00Z"))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::IllegalTransition { .. }));
        assert_eq!(r.status, RequestStatus::Approved);
    }

    #[test]
    fn approved_cannot_become_rejected() {
        let mut r = make_request();
        r.transition(RequestStatus::Approved, &staff(), ts("2025-01-16T02:00:00Z"))
            .unwrap();
        assert!(r
            .transition(RequestStatus::Rejected, &staff(), ts("2025-01-17T02:00:00Z"))
            .is_err());
    }

    #[test]
    fn repeating_decision_is_idempotent() {
        let mut r = make_request();
        let first = ts("2025-01-16T02:00:00Z");
        r.transition(RequestStatus::Approved, &staff(), first).unwrap();
        let other = ActorId::new("staff-2").unwrap();
        let outcome = r
            .transition(RequestStatus::Approved, &other, ts("2025-01-18T02:00:00Z"))
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Unchanged);
        assert_eq!(r.approved_at, Some(first));
        assert_eq!(r.approved_by, Some(staff()));
        assert_eq!(r.updated_at, first);
        assert_eq!(r.transitions.len(), 1);
    }

    #[test]
    fn pending_to_pending_is_noop() {
        let mut r = make_request();
        let outcome = r
            .transition(RequestStatus::Pending, &staff(), ts("2025-01-16T02:00:00Z"))
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Unchanged);
        assert!(r.approved_by.is_none());
    }

    #[test]
    fn status_parsing() {
        assert_eq!("approved".parse::<RequestStatus>().unwrap(), RequestStatus::Approved);
        let err = "in_progress".parse::<RequestStatus>().unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidStatus { .. }));
        assert!("Approved".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
    }

    #[test]
    fn statuses_order_by_lifecycle() {
        let mut all = vec![
            RequestStatus::Rejected,
            RequestStatus::Pending,
            RequestStatus::Approved,
        ];
        all.sort();
        assert_eq!(all, RequestStatus::all());
    }

    #[test]
    fn serializes_with_wire_names() {
        let r = make_request();
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["ref"], "REQ-2025-01-00001");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["fullName"], "Ana Santos");
        assert!(json.get("docTypeId").is_some());
        let back: DocumentRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }
}
