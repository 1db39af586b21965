//! # Transition Graph Primitives
//!
//! Shared machinery for the request and complaint lifecycles. Each status
//! enum declares its directed graph through [`LifecycleStatus`]; the
//! [`check_transition`] function applies the common policy:
//!
//! - target == current: idempotent no-op, reported as [`TransitionOutcome::Unchanged`].
//! - edge present in the graph: [`TransitionOutcome::Applied`].
//! - anything else: [`LifecycleError::IllegalTransition`].
//!
//! Terminal statuses have no outgoing edges, so a terminal entity can only
//! be "transitioned" to its own status.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use civic_core::{ActorId, CivicError, Timestamp};

/// A status enum with an explicit forward-only transition graph.
pub trait LifecycleStatus:
    Copy + Eq + std::fmt::Debug + std::fmt::Display + std::str::FromStr<Err = LifecycleError> + 'static
{
    /// Entity kind name used in error messages ("request", "complaint").
    const ENTITY: &'static str;

    /// Status every new entity starts in.
    const INITIAL: Self;

    /// Every member of the enum.
    fn all() -> &'static [Self];

    /// Statuses from which `target` may be entered directly.
    fn allowed_sources(target: Self) -> &'static [Self];

    /// Wire name (snake_case).
    fn as_str(&self) -> &'static str;

    /// Whether entering this status stamps the actor/timestamp audit pair.
    fn is_audit_bearing(&self) -> bool;

    /// Whether an edge `self -> target` exists.
    fn can_transition_to(&self, target: Self) -> bool {
        Self::allowed_sources(target).contains(self)
    }

    /// Whether no outgoing edges exist.
    fn is_terminal(&self) -> bool {
        !Self::all().iter().any(|s| self.can_transition_to(*s))
    }
}

/// Errors raised by lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// The target is not a member of the entity's status enum.
    #[error("invalid {entity} status {value:?}; expected one of: {expected}")]
    InvalidStatus {
        /// Entity kind.
        entity: &'static str,
        /// The rejected value.
        value: String,
        /// Comma-separated valid values.
        expected: String,
    },

    /// The edge is not in the transition graph.
    #[error("illegal {entity} transition: {from} -> {to}")]
    IllegalTransition {
        /// Entity kind.
        entity: &'static str,
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },
}

impl From<LifecycleError> for CivicError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidStatus { .. } => Self::Validation(err.to_string()),
            LifecycleError::IllegalTransition { .. } => Self::Conflict(err.to_string()),
        }
    }
}

/// Parse a wire status name against `S::all()`.
pub fn parse_status<S: LifecycleStatus>(value: &str) -> Result<S, LifecycleError> {
    S::all()
        .iter()
        .copied()
        .find(|s| s.as_str() == value)
        .ok_or_else(|| LifecycleError::InvalidStatus {
            entity: S::ENTITY,
            value: value.to_string(),
            expected: S::all()
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// Result of a transition request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome<S> {
    /// The status changed.
    Applied {
        /// Previous status.
        from: S,
        /// New status.
        to: S,
    },
    /// Target equals the current status; nothing was written.
    Unchanged,
}

impl<S> TransitionOutcome<S> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Decide whether `current -> target` is applied, a no-op, or illegal.
pub fn check_transition<S: LifecycleStatus>(
    current: S,
    target: S,
) -> Result<TransitionOutcome<S>, LifecycleError> {
    if current == target {
        return Ok(TransitionOutcome::Unchanged);
    }
    if current.can_transition_to(target) {
        Ok(TransitionOutcome::Applied {
            from: current,
            to: target,
        })
    } else {
        Err(LifecycleError::IllegalTransition {
            entity: S::ENTITY,
            from: current.to_string(),
            to: target.to_string(),
        })
    }
}

/// Record of an applied status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord<S> {
    pub from: S,
    pub to: S,
    pub actor: ActorId,
    pub at: Timestamp,
}

/// Stamp an actor/timestamp audit pair unless it is already set.
///
/// Audit fields are write-once: a stamped pair is never cleared or
/// overwritten. Returns whether anything was written.
pub fn stamp_audit(
    by: &mut Option<ActorId>,
    at: &mut Option<Timestamp>,
    actor: &ActorId,
    now: Timestamp,
) -> bool {
    if by.is_some() || at.is_some() {
        return false;
    }
    *by = Some(actor.clone());
    *at = Some(now);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complaint::ComplaintStatus;
    use crate::request::RequestStatus;

    fn actor() -> ActorId {
        ActorId::new("staff-1").unwrap()
    }

    #[test]
    fn same_status_is_unchanged() {
        assert_eq!(
            check_transition(RequestStatus::Approved, RequestStatus::Approved).unwrap(),
            TransitionOutcome::Unchanged
        );
    }

    #[test]
    fn illegal_edge_reports_both_ends() {
        let err = check_transition(ComplaintStatus::Resolved, ComplaintStatus::Pending).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::IllegalTransition {
                entity: "complaint",
                from: "resolved".into(),
                to: "pending".into(),
            }
        );
        assert_eq!(CivicError::from(err).kind(), civic_core::ErrorKind::Conflict);
    }

    #[test]
    fn invalid_status_lists_members() {
        let err = parse_status::<RequestStatus>("done").unwrap_err();
        assert!(err.to_string().contains("pending, approved, rejected"));
        assert_eq!(CivicError::from(err).kind(), civic_core::ErrorKind::Validation);
    }

    #[test]
    fn no_status_can_reenter_initial() {
        for s in RequestStatus::all() {
            assert!(!s.can_transition_to(RequestStatus::INITIAL));
        }
        for s in ComplaintStatus::all() {
            assert!(!s.can_transition_to(ComplaintStatus::INITIAL));
        }
    }

    #[test]
    fn stamp_audit_is_write_once() {
        let mut by = None;
        let mut at = None;
        let first = Timestamp::parse("2025-01-01T00:00:00Z").unwrap();
        assert!(stamp_audit(&mut by, &mut at, &actor(), first));
        let other = ActorId::new("admin").unwrap();
        let later = Timestamp::parse("2025-06-01T00:00:00Z").unwrap();
        assert!(!stamp_audit(&mut by, &mut at, &other, later));
        assert_eq!(by, Some(actor()));
        assert_eq!(at, Some(first));
    }

    #[test]
    fn transition_record_is_camel_case() {
        let record = TransitionRecord {
            from: ComplaintStatus::Pending,
            to: ComplaintStatus::InProgress,
            actor: actor(),
            at: Timestamp::parse("2025-01-01T00:00:00Z").unwrap(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["to"], "in_progress");
        assert_eq!(json["actor"], "staff-1");
    }
}
