//! # Transition Service
//!
//! Applies a staff-requested status change to a stored request or
//! complaint. The domain decision (legal edge, audit stamping, history) is
//! made by `civic-state` on a fresh read; the write is a compare-and-set on
//! the status observed by that read. If another writer moved the status in
//! between, the CAS fails and the decision is re-made against the new row.

use async_trait::async_trait;

use civic_core::{ActorId, CivicError, ComplaintId, RequestId, Timestamp};
use civic_state::{
    Complaint, ComplaintStatus, DocumentRequest, LifecycleError, LifecycleStatus, RequestStatus,
    TransitionOutcome,
};

use crate::store::{CivicStore, StoreError};

/// Re-reads allowed when the compare-and-set loses a race.
pub const MAX_CAS_ATTEMPTS: u32 = 3;

/// A stored entity with a status lifecycle.
#[async_trait]
pub trait Tracked: Clone + Send + Sync + Sized {
    type Id: Copy + Send + Sync + std::fmt::Display;
    type Status: LifecycleStatus + Send + Sync;

    fn status(&self) -> Self::Status;

    fn apply(
        &mut self,
        target: Self::Status,
        actor: &ActorId,
        now: Timestamp,
    ) -> Result<TransitionOutcome<Self::Status>, LifecycleError>;

    async fn load(store: &dyn CivicStore, id: Self::Id) -> Result<Option<Self>, StoreError>;

    async fn replace_if(
        store: &dyn CivicStore,
        updated: &Self,
        expected: Self::Status,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
impl Tracked for DocumentRequest {
    type Id = RequestId;
    type Status = RequestStatus;

    fn status(&self) -> RequestStatus {
        self.status
    }

    fn apply(
        &mut self,
        target: RequestStatus,
        actor: &ActorId,
        now: Timestamp,
    ) -> Result<TransitionOutcome<RequestStatus>, LifecycleError> {
        self.transition(target, actor, now)
    }

    async fn load(store: &dyn CivicStore, id: RequestId) -> Result<Option<Self>, StoreError> {
        store.get_request(id).await
    }

    async fn replace_if(
        store: &dyn CivicStore,
        updated: &Self,
        expected: RequestStatus,
    ) -> Result<bool, StoreError> {
        store.replace_request_if(updated, expected).await
    }
}

#[async_trait]
impl Tracked for Complaint {
    type Id = ComplaintId;
    type Status = ComplaintStatus;

    fn status(&self) -> ComplaintStatus {
        self.status
    }

    fn apply(
        &mut self,
        target: ComplaintStatus,
        actor: &ActorId,
        now: Timestamp,
    ) -> Result<TransitionOutcome<ComplaintStatus>, LifecycleError> {
        self.transition(target, actor, now)
    }

    async fn load(store: &dyn CivicStore, id: ComplaintId) -> Result<Option<Self>, StoreError> {
        store.get_complaint(id).await
    }

    async fn replace_if(
        store: &dyn CivicStore,
        updated: &Self,
        expected: ComplaintStatus,
    ) -> Result<bool, StoreError> {
        store.replace_complaint_if(updated, expected).await
    }
}

/// Move entity `id` to `target` on behalf of `actor`.
///
/// - unknown id: `NotFound`
/// - target equals current status: the stored entity, unchanged
/// - edge not in the graph: `Conflict`
/// - lost the compare-and-set [`MAX_CAS_ATTEMPTS`] times: `Conflict`
pub async fn transition<E: Tracked>(
    store: &dyn CivicStore,
    id: E::Id,
    target: E::Status,
    actor: &ActorId,
) -> Result<E, CivicError> {
    for attempt in 1..=MAX_CAS_ATTEMPTS {
        let Some(mut entity) = E::load(store, id).await? else {
            return Err(CivicError::NotFound(format!("{id} not found")));
        };
        let expected = entity.status();

        match entity.apply(target, actor, Timestamp::now())? {
            TransitionOutcome::Unchanged => {
                tracing::debug!(%id, status = %target, "status already set, nothing to do");
                return Ok(entity);
            }
            TransitionOutcome::Applied { from, to } => {
                if E::replace_if(store, &entity, expected).await? {
                    metrics::counter!(
                        "civic_transitions_total",
                        "entity" => E::Status::ENTITY,
                        "to" => to.as_str()
                    )
                    .increment(1);
                    tracing::info!(%id, %from, %to, actor = %actor, "status changed");
                    return Ok(entity);
                }
                tracing::warn!(%id, attempt, "status changed concurrently, re-reading");
            }
        }
    }
    Err(CivicError::Conflict(format!(
        "{id} was modified concurrently; retry the request"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use civic_core::{Bucket, ErrorKind, RefKind};
    use civic_state::ComplaintDetails;

    use crate::store::MemoryStore;

    fn staff() -> ActorId {
        ActorId::new("staff-1").unwrap()
    }

    async fn stored_complaint(store: &MemoryStore) -> Complaint {
        let details = ComplaintDetails {
            reporter_name: "Lito".into(),
            contact_number: None,
            address: None,
            complaint_type: "stray animals".into(),
            description: "Dogs roaming at night".into(),
        };
        let reference = Bucket::new(RefKind::Complaint, 2025, 4)
            .unwrap()
            .reference(1)
            .unwrap();
        let complaint = Complaint::open(reference, details.verify().unwrap(), Timestamp::now());
        store.insert_complaint(&complaint).await.unwrap();
        complaint
    }

    #[tokio::test]
    async fn applies_and_persists() {
        let store = MemoryStore::new();
        let complaint = stored_complaint(&store).await;
        let updated: Complaint =
            transition(&store, complaint.id, ComplaintStatus::Resolved, &staff())
                .await
                .unwrap();
        assert!(updated.is_resolved());
        assert_eq!(updated.processed_by, Some(staff()));
        let stored = store.get_complaint(complaint.id).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn resolving_twice_keeps_first_audit() {
        let store = MemoryStore::new();
        let complaint = stored_complaint(&store).await;
        let first: Complaint =
            transition(&store, complaint.id, ComplaintStatus::Resolved, &staff())
                .await
                .unwrap();
        let second: Complaint = transition(
            &store,
            complaint.id,
            ComplaintStatus::Resolved,
            &ActorId::new("staff-2").unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(second.resolved_at, first.resolved_at);
        assert_eq!(second.processed_by, Some(staff()));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let err = transition::<Complaint>(&store, ComplaintId::new(), ComplaintStatus::Resolved, &staff())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn backwards_edge_is_conflict() {
        let store = MemoryStore::new();
        let complaint = stored_complaint(&store).await;
        transition::<Complaint>(&store, complaint.id, ComplaintStatus::InProgress, &staff())
            .await
            .unwrap();
        let err = transition::<Complaint>(&store, complaint.id, ComplaintStatus::Pending, &staff())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_resolvers_stamp_once() {
        let store = Arc::new(MemoryStore::new());
        let complaint = stored_complaint(&store).await;
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            let id = complaint.id;
            handles.push(tokio::spawn(async move {
                let actor = ActorId::new(format!("staff-{i}")).unwrap();
                transition::<Complaint>(store.as_ref(), id, ComplaintStatus::Resolved, &actor).await
            }));
        }
        for handle in handles {
            // Every caller either applied or observed the terminal status.
            let result = handle.await.unwrap();
            assert!(result.is_ok() || result.unwrap_err().kind() == ErrorKind::Conflict);
        }
        let stored = store.get_complaint(complaint.id).await.unwrap().unwrap();
        assert_eq!(stored.transitions.len(), 1);
        assert!(stored.processed_by.is_some());
    }
}
