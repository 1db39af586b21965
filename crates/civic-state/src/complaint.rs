//! # Complaint Lifecycle
//!
//! ```text
//! pending ──▶ in_progress ──▶ resolved  (terminal)
//!    └─────────────────────────▲
//! ```
//!
//! `processedBy` / `resolvedAt` are stamped when the complaint is resolved.

use serde::{Deserialize, Serialize};

use civic_core::{ActorId, ComplaintId, Reference, Timestamp};

use crate::intake::{ComplaintDetails, VerifiedComplaint};
use crate::lifecycle::{
    check_transition, parse_status, stamp_audit, LifecycleError, LifecycleStatus,
    TransitionOutcome, TransitionRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Pending,
    InProgress,
    Resolved,
}

impl LifecycleStatus for ComplaintStatus {
    const ENTITY: &'static str = "complaint";
    const INITIAL: Self = Self::Pending;

    fn all() -> &'static [Self] {
        &[Self::Pending, Self::InProgress, Self::Resolved]
    }

    fn allowed_sources(target: Self) -> &'static [Self] {
        match target {
            Self::Pending => &[],
            Self::InProgress => &[Self::Pending],
            Self::Resolved => &[Self::Pending, Self::InProgress],
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
        }
    }

    fn is_audit_bearing(&self) -> bool {
        matches!(self, Self::Resolved)
    }
}

impl std::fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComplaintStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s)
    }
}

/// A complaint encoded by staff on behalf of a resident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: ComplaintId,
    #[serde(rename = "ref")]
    pub reference: Reference,
    #[serde(flatten)]
    pub details: ComplaintDetails,
    pub status: ComplaintStatus,
    #[serde(default)]
    pub processed_by: Option<ActorId>,
    #[serde(default)]
    pub resolved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub transitions: Vec<TransitionRecord<ComplaintStatus>>,
}

impl Complaint {
    pub fn open(reference: Reference, details: VerifiedComplaint, now: Timestamp) -> Self {
        Self {
            id: ComplaintId::new(),
            reference,
            details: details.into_details(),
            status: ComplaintStatus::INITIAL,
            processed_by: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
            transitions: Vec::new(),
        }
    }

    /// Move to `target`. Resolving stamps `processed_by` and `resolved_at`
    /// the first time only.
    pub fn transition(
        &mut self,
        target: ComplaintStatus,
        actor: &ActorId,
        now: Timestamp,
    ) -> Result<TransitionOutcome<ComplaintStatus>, LifecycleError> {
        let outcome = check_transition(self.status, target)?;
        if let TransitionOutcome::Applied { from, to } = outcome {
            self.status = to;
            if to.is_audit_bearing() {
                stamp_audit(&mut self.processed_by, &mut self.resolved_at, actor, now);
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

    pub fn is_resolved(&self) -> bool {
        self.status == ComplaintStatus::Resolved
    }
}
