//! In-memory [`CivicStore`] backed by `parking_lot` locks.
//!
//! Each map is guarded by its own `RwLock`; every trait operation takes the
//! lock exactly once, so read-check-write sequences (unique references,
//! status compare-and-set, counter increments) are atomic.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};

use civic_core::{Bucket, ComplaintId, DocumentTypeId, Reference, RequestId, Timestamp};
use civic_state::{
    CatalogEntry, Complaint, ComplaintStatus, DocumentRequest, DocumentType, RequestStatus,
};

use super::{CivicStore, DailyCount, StatusCount, StoreError, UpsertOutcome};

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// The lock is never held across an `.await`, so a synchronous
/// `parking_lot::RwLock` is used. It does not poison on panic.
#[derive(Debug)]
pub struct Store<K, T> {
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K, T> Clone for Store<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash + Copy, T: Clone> Store<K, T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn get(&self, id: &K) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// First record matching `pred`.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.data.read().values().find(|v| pred(v)).cloned()
    }

    /// Insert under a single write lock unless the key exists or any stored
    /// record `conflicts` with the new one. Returns `false` when rejected.
    pub fn insert_unique(&self, id: K, value: T, conflicts: impl Fn(&T) -> bool) -> bool {
        let mut guard = self.data.write();
        if guard.contains_key(&id) || guard.values().any(|v| conflicts(v)) {
            return false;
        }
        guard.insert(id, value);
        true
    }

    /// Atomically read-validate-update a record.
    ///
    /// Returns `None` if the record doesn't exist, or `Some` with the
    /// closure's result.
    pub fn try_update<R, E>(
        &self,
        id: &K,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    pub fn remove(&self, id: &K) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Remove every record matching `pred`, returning how many went.
    pub fn remove_where(&self, pred: impl Fn(&T) -> bool) -> usize {
        let mut guard = self.data.write();
        let before = guard.len();
        guard.retain(|_, v| !pred(v));
        before - guard.len()
    }

}

impl<K: Eq + Hash + Copy, T: Clone> Default for Store<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Civic store --------------------------------------------------------------

/// Development and test backend. State is lost on restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    requests: Store<RequestId, DocumentRequest>,
    complaints: Store<ComplaintId, Complaint>,
    document_types: Store<DocumentTypeId, DocumentType>,
    /// Last issued sequence per bucket. The mutex is the allocation
    /// primitive for this backend.
    counters: Arc<Mutex<HashMap<Bucket, u32>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(mut items: Vec<T>, created: impl Fn(&T) -> (Timestamp, String)) -> Vec<T> {
    items.sort_by(|a, b| created(b).cmp(&created(a)));
    items
}

fn status_counts<S: Ord>(statuses: impl IntoIterator<Item = S>) -> Vec<StatusCount<S>> {
    let mut groups: BTreeMap<S, u64> = BTreeMap::new();
    for status in statuses {
        *groups.entry(status).or_insert(0) += 1;
    }
    groups
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect()
}

fn daily_counts<K: Ord>(entries: impl IntoIterator<Item = (NaiveDate, K)>) -> Vec<DailyCount<K>> {
    let mut groups: BTreeMap<(NaiveDate, K), u64> = BTreeMap::new();
    for entry in entries {
        *groups.entry(entry).or_insert(0) += 1;
    }
    groups
        .into_iter()
        .map(|((day, key), count)| DailyCount { day, key, count })
        .collect()
}

#[async_trait]
impl CivicStore for MemoryStore {
    async fn next_sequence(&self, bucket: Bucket) -> Result<u32, StoreError> {
        let mut counters = self.counters.lock();
        let slot = counters.entry(bucket).or_insert(0);
        *slot = slot.saturating_add(1);
        Ok(*slot)
    }

    async fn last_sequence(&self, bucket: Bucket) -> Result<u32, StoreError> {
        Ok(self.counters.lock().get(&bucket).copied().unwrap_or(0))
    }

    async fn insert_request(&self, request: &DocumentRequest) -> Result<(), StoreError> {
        let reference = request.reference;
        if self
            .requests
            .insert_unique(request.id, request.clone(), |r| r.reference == reference)
        {
            Ok(())
        } else {
            Err(StoreError::UniqueViolation(format!(
                "document request {reference} already exists"
            )))
        }
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<DocumentRequest>, StoreError> {
        Ok(self.requests.get(&id))
    }

    async fn find_request(&self, reference: Reference) -> Result<Option<DocumentRequest>, StoreError> {
        Ok(self.requests.find(|r| r.reference == reference))
    }

    async fn list_requests(&self) -> Result<Vec<DocumentRequest>, StoreError> {
        Ok(newest_first(self.requests.list(), |r| {
            (r.created_at, r.reference.to_code())
        }))
    }

    async fn replace_request_if(
        &self,
        updated: &DocumentRequest,
        expected: RequestStatus,
    ) -> Result<bool, StoreError> {
        let replaced = self.requests.try_update(&updated.id, |current| {
            if current.status != expected {
                return Err(());
            }
            *current = updated.clone();
            Ok(())
        });
        Ok(matches!(replaced, Some(Ok(()))))
    }

    async fn delete_request(&self, id: RequestId) -> Result<Option<DocumentRequest>, StoreError> {
        Ok(self.requests.remove(&id))
    }

    async fn insert_complaint(&self, complaint: &Complaint) -> Result<(), StoreError> {
        let reference = complaint.reference;
        if self
            .complaints
            .insert_unique(complaint.id, complaint.clone(), |c| c.reference == reference)
        {
            Ok(())
        } else {
            Err(StoreError::UniqueViolation(format!(
                "complaint {reference} already exists"
            )))
        }
    }

    async fn get_complaint(&self, id: ComplaintId) -> Result<Option<Complaint>, StoreError> {
        Ok(self.complaints.get(&id))
    }

    async fn list_complaints(&self) -> Result<Vec<Complaint>, StoreError> {
        Ok(newest_first(self.complaints.list(), |c| {
            (c.created_at, c.reference.to_code())
        }))
    }

    async fn replace_complaint_if(
        &self,
        updated: &Complaint,
        expected: ComplaintStatus,
    ) -> Result<bool, StoreError> {
        let replaced = self.complaints.try_update(&updated.id, |current| {
            if current.status != expected {
                return Err(());
            }
            *current = updated.clone();
            Ok(())
        });
        Ok(matches!(replaced, Some(Ok(()))))
    }

    async fn delete_complaint(&self, id: ComplaintId) -> Result<Option<Complaint>, StoreError> {
        Ok(self.complaints.remove(&id))
    }

    async fn list_document_types(&self) -> Result<Vec<DocumentType>, StoreError> {
        let mut all = self.document_types.list();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn get_document_type(&self, id: DocumentTypeId) -> Result<Option<DocumentType>, StoreError> {
        Ok(self.document_types.get(&id))
    }

    async fn insert_document_type(&self, doc_type: &DocumentType) -> Result<(), StoreError> {
        let name = doc_type.name.clone();
        if self
            .document_types
            .insert_unique(doc_type.id, doc_type.clone(), |d| d.name == name)
        {
            Ok(())
        } else {
            Err(StoreError::UniqueViolation(format!(
                "document type {name:?} already exists"
            )))
        }
    }

    async fn update_document_type(&self, doc_type: &DocumentType) -> Result<bool, StoreError> {
        // Name uniqueness must be checked under the same write lock as the update.
        let mut guard = self.document_types.data.write();
        if guard
            .values()
            .any(|d| d.id != doc_type.id && d.name == doc_type.name)
        {
            return Err(StoreError::UniqueViolation(format!(
                "document type {:?} already exists",
                doc_type.name
            )));
        }
        match guard.get_mut(&doc_type.id) {
            Some(current) => {
                *current = doc_type.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upsert_document_type(
        &self,
        entry: &CatalogEntry,
        now: Timestamp,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut guard = self.document_types.data.write();
        if let Some(existing) = guard.values_mut().find(|d| d.name == entry.name) {
            return Ok(if existing.apply(entry, now) {
                UpsertOutcome::Updated
            } else {
                UpsertOutcome::Unchanged
            });
        }
        let created = DocumentType::from_entry(entry, now);
        guard.insert(created.id, created);
        Ok(UpsertOutcome::Created)
    }

    async fn delete_document_type_by_name(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.document_types.remove_where(|d| d.name == name) > 0)
    }

    async fn count_requests_by_status(
        &self,
    ) -> Result<Vec<StatusCount<RequestStatus>>, StoreError> {
        Ok(status_counts(self.requests.list().into_iter().map(|r| r.status)))
    }

    async fn count_complaints_by_status(
        &self,
    ) -> Result<Vec<StatusCount<ComplaintStatus>>, StoreError> {
        Ok(status_counts(
            self.complaints.list().into_iter().map(|c| c.status),
        ))
    }

    async fn daily_requests_by_doc_type(
        &self,
        since: Timestamp,
    ) -> Result<Vec<DailyCount<Option<String>>>, StoreError> {
        let names: HashMap<DocumentTypeId, String> = self
            .document_types
            .list()
            .into_iter()
            .map(|d| (d.id, d.name))
            .collect();
        let entries = self
            .requests
            .list()
            .into_iter()
            .filter(|r| r.created_at >= since)
            .map(|r| {
                (
                    r.created_at.civic_local().date(),
                    names.get(&r.doc_type_id).cloned(),
                )
            });
        Ok(daily_counts(entries))
    }

    async fn daily_complaints_by_status(
        &self,
        since: Timestamp,
    ) -> Result<Vec<DailyCount<ComplaintStatus>>, StoreError> {
        let entries = self
            .complaints
            .list()
            .into_iter()
            .filter(|c| c.created_at >= since)
            .map(|c| (c.created_at.civic_local().date(), c.status));
        Ok(daily_counts(entries))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
