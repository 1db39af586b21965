//! # Civic Service
//!
//! Orchestrates the operations exposed over HTTP: validate input, allocate a
//! reference, persist, transition, delete. Handlers stay thin and call into
//! [`CivicService`].

use std::sync::Arc;

use civic_core::{
    ActorId, BlobId, CivicError, ComplaintId, DocumentTypeId, RefKind, Reference,
    RequestId, Timestamp,
};
use civic_state::{
    Applicant, CatalogEntry, Complaint, ComplaintDetails, ComplaintStatus, DocumentRequest,
    DocumentType, RequestStatus,
};

use crate::allocator::ReferenceAllocator;
use crate::analytics::{window_start, DashboardStats};
use crate::blob::{Blob, BlobStore};
use crate::lifecycle;
use crate::store::{CivicStore, DailyCount, StoreError};

/// A resident's filing, before validation.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub applicant: Applicant,
    pub doc_type_id: DocumentTypeId,
    pub user_id: Option<ActorId>,
    pub uploaded_file_id: Option<BlobId>,
}

#[derive(Debug, Clone)]
pub struct CivicService {
    store: Arc<dyn CivicStore>,
    blobs: Arc<dyn BlobStore>,
    allocator: ReferenceAllocator,
}

impl CivicService {
    pub fn new(
        store: Arc<dyn CivicStore>,
        blobs: Arc<dyn BlobStore>,
        allocator: ReferenceAllocator,
    ) -> Self {
        Self {
            store,
            blobs,
            allocator,
        }
    }

    pub fn store(&self) -> &Arc<dyn CivicStore> {
        &self.store
    }

    // ── Document requests ───────────────────────────────────────────

    /// File a document request.
    ///
    /// All validation (document type, applicant fields, attached blob)
    /// happens before a reference is allocated.
    pub async fn file_request(&self, new: NewRequest) -> Result<DocumentRequest, CivicError> {
        let NewRequest {
            applicant,
            doc_type_id,
            user_id,
            uploaded_file_id,
        } = new;

        let doc_type = self
            .store
            .get_document_type(doc_type_id)
            .await?
            .ok_or_else(|| CivicError::NotFound(format!("{doc_type_id} not found")))?;

        let application = applicant.verify_for(&doc_type)?;

        if let Some(blob_id) = uploaded_file_id {
            if !self.blobs.exists(blob_id).await? {
                return Err(CivicError::Validation(format!(
                    "uploadedFileId {} does not refer to a stored file",
                    blob_id.as_uuid()
                )));
            }
        }

        let now = Timestamp::now();
        let request = self
            .allocator
            .issue(RefKind::Request, now, |reference| {
                let request = DocumentRequest::file(
                    reference,
                    application.clone(),
                    user_id.clone(),
                    uploaded_file_id,
                    now,
                );
                let store = Arc::clone(&self.store);
                async move {
                    store.insert_request(&request).await?;
                    Ok::<_, StoreError>(request)
                }
            })
            .await?;

        tracing::info!(
            id = %request.id,
            reference = %request.reference,
            doc_type = %doc_type.name,
            "document request filed"
        );
        Ok(request)
    }

    /// Look up a request by its reference code.
    pub async fn request_status(&self, code: &str) -> Result<DocumentRequest, CivicError> {
        let reference = Reference::parse(code.trim())?;
        if reference.kind() != RefKind::Request {
            return Err(CivicError::Validation(format!(
                "{reference} is not a document request reference"
            )));
        }
        self.store
            .find_request(reference)
            .await?
            .ok_or_else(|| CivicError::NotFound(format!("no request with reference {reference}")))
    }

    pub async fn list_requests(&self) -> Result<Vec<DocumentRequest>, CivicError> {
        Ok(self.store.list_requests().await?)
    }

    pub async fn get_request(&self, id: RequestId) -> Result<DocumentRequest, CivicError> {
        self.store
            .get_request(id)
            .await?
            .ok_or_else(|| CivicError::NotFound(format!("{id} not found")))
    }

    pub async fn transition_request(
        &self,
        id: RequestId,
        target: RequestStatus,
        actor: &ActorId,
    ) -> Result<DocumentRequest, CivicError> {
        lifecycle::transition::<DocumentRequest>(self.store.as_ref(), id, target, actor).await
    }

    /// Delete a request and, best effort, its uploaded blob.
    pub async fn delete_request(&self, id: RequestId) -> Result<DocumentRequest, CivicError> {
        let request = self
            .store
            .delete_request(id)
            .await?
            .ok_or_else(|| CivicError::NotFound(format!("{id} not found")))?;

        if let Some(blob_id) = request.uploaded_file_id {
            if let Err(err) = self.blobs.delete(blob_id).await {
                tracing::warn!(
                    request = %request.id,
                    blob = %blob_id,
                    error = %err,
                    "failed to delete uploaded file for deleted request"
                );
            }
        }
        tracing::info!(id = %request.id, reference = %request.reference, "document request deleted");
        Ok(request)
    }

    // ── Complaints ──────────────────────────────────────────────────

    pub async fn open_complaint(&self, details: ComplaintDetails) -> Result<Complaint, CivicError> {
        let verified = details.verify()?;
        let now = Timestamp::now();
        let complaint = self
            .allocator
            .issue(RefKind::Complaint, now, |reference| {
                let complaint = Complaint::open(reference, verified.clone(), now);
                let store = Arc::clone(&self.store);
                async move {
                    store.insert_complaint(&complaint).await?;
                    Ok::<_, StoreError>(complaint)
                }
            })
            .await?;

        tracing::info!(id = %complaint.id, reference = %complaint.reference, "complaint encoded");
        Ok(complaint)
    }

    pub async fn list_complaints(&self) -> Result<Vec<Complaint>, CivicError> {
        Ok(self.store.list_complaints().await?)
    }

    pub async fn get_complaint(&self, id: ComplaintId) -> Result<Complaint, CivicError> {
        self.store
            .get_complaint(id)
            .await?
            .ok_or_else(|| CivicError::NotFound(format!("{id} not found")))
    }

    pub async fn transition_complaint(
        &self,
        id: ComplaintId,
        target: ComplaintStatus,
        actor: &ActorId,
    ) -> Result<Complaint, CivicError> {
        lifecycle::transition::<Complaint>(self.store.as_ref(), id, target, actor).await
    }

    pub async fn delete_complaint(&self, id: ComplaintId) -> Result<Complaint, CivicError> {
        let complaint = self
            .store
            .delete_complaint(id)
            .await?
            .ok_or_else(|| CivicError::NotFound(format!("{id} not found")))?;
        tracing::info!(id = %complaint.id, reference = %complaint.reference, "complaint deleted");
        Ok(complaint)
    }

    // ── Document types ──────────────────────────────────────────────

    pub async fn list_document_types(&self) -> Result<Vec<DocumentType>, CivicError> {
        Ok(self.store.list_document_types().await?)
    }

    pub async fn create_document_type(
        &self,
        entry: CatalogEntry,
    ) -> Result<DocumentType, CivicError> {
        let entry = normalize_entry(entry)?;
        let doc_type = DocumentType::from_entry(&entry, Timestamp::now());
        match self.store.insert_document_type(&doc_type).await {
            Ok(()) => {
                tracing::info!(id = %doc_type.id, name = %doc_type.name, "document type created");
                Ok(doc_type)
            }
            Err(StoreError::UniqueViolation(_)) => Err(CivicError::Conflict(format!(
                "a document type named {:?} already exists",
                entry.name
            ))),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn update_document_type(
        &self,
        id: DocumentTypeId,
        entry: CatalogEntry,
    ) -> Result<DocumentType, CivicError> {
        let entry = normalize_entry(entry)?;
        let mut doc_type = self
            .store
            .get_document_type(id)
            .await?
            .ok_or_else(|| CivicError::NotFound(format!("{id} not found")))?;

        let now = Timestamp::now();
        let renamed = doc_type.name != entry.name;
        let changed = doc_type.apply(&entry, now);
        if renamed {
            doc_type.name = entry.name.clone();
            doc_type.updated_at = now;
        }
        if !renamed && !changed {
            return Ok(doc_type);
        }
        match self.store.update_document_type(&doc_type).await {
            Ok(true) => {
                tracing::info!(%id, name = %doc_type.name, "document type updated");
                Ok(doc_type)
            }
            Ok(false) => Err(CivicError::NotFound(format!("{id} not found"))),
            Err(StoreError::UniqueViolation(_)) => Err(CivicError::Conflict(format!(
                "a document type named {:?} already exists",
                entry.name
            ))),
            Err(err) => Err(err.into()),
        }
    }

    // ── Files ───────────────────────────────────────────────────────

    pub async fn upload_blob(&self, blob: Blob) -> Result<BlobId, CivicError> {
        let size = blob.bytes.len();
        let id = self.blobs.put(blob).await?;
        tracing::info!(blob = %id, size, "file stored");
        Ok(id)
    }

    pub async fn get_blob(&self, id: BlobId) -> Result<Blob, CivicError> {
        Ok(self.blobs.get(id).await?)
    }

    // ── Analytics ───────────────────────────────────────────────────

    /// Totals and per-status counts for the staff dashboard.
    pub async fn dashboard(&self) -> Result<DashboardStats, CivicError> {
        let requests = self.store.count_requests_by_status().await?;
        let complaints = self.store.count_complaints_by_status().await?;
        Ok(DashboardStats::from_counts(&requests, &complaints))
    }

    /// Requests filed in the window ending at `now`, per day and document type.
    pub async fn weekly_requests(
        &self,
        now: Timestamp,
    ) -> Result<Vec<DailyCount<Option<String>>>, CivicError> {
        Ok(self
            .store
            .daily_requests_by_doc_type(window_start(now))
            .await?)
    }

    /// Complaints received in the window ending at `now`, per day and status.
    pub async fn weekly_complaints(
        &self,
        now: Timestamp,
    ) -> Result<Vec<DailyCount<ComplaintStatus>>, CivicError> {
        Ok(self
            .store
            .daily_complaints_by_status(window_start(now))
            .await?)
    }

    pub async fn ping(&self) -> Result<(), CivicError> {
        Ok(self.store.ping().await?)
    }
}

fn normalize_entry(mut entry: CatalogEntry) -> Result<CatalogEntry, CivicError> {
    entry.name = entry.name.trim().to_string();
    if entry.name.is_empty() {
        return Err(CivicError::Validation("name must not be empty".into()));
    }
    entry.description = entry.description.trim().to_string();
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_core::{Bucket, ErrorKind};
    use civic_state::RequiredField;

    use crate::allocator::RetryPolicy;
    use crate::blob::MemoryBlobStore;
    use crate::store::MemoryStore;

    fn service() -> (CivicService, Arc<MemoryStore>, Arc<MemoryBlobStore>) {
        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let allocator = ReferenceAllocator::new(store.clone(), RetryPolicy::default());
        (
            CivicService::new(store.clone(), blobs.clone(), allocator),
            store,
            blobs,
        )
    }

    fn applicant() -> Applicant {
        Applicant {
            full_name: "Ana Reyes".into(),
            contact_number: "09171234567".into(),
            address: "Purok 3".into(),
            purpose: "Employment".into(),
            age: 22,
            marital_status: None,
            edu_attainment: None,
            edu_course: None,
        }
    }

    async fn job_seeker_type(svc: &CivicService) -> DocumentType {
        svc.create_document_type(CatalogEntry::new(
            "First-time Job Seeker",
            "",
            [RequiredField::EduAttainment, RequiredField::EduCourse],
        ))
        .await
        .unwrap()
    }

    fn actor() -> ActorId {
        ActorId::new("staff-7").unwrap()
    }

    #[tokio::test]
    async fn missing_required_field_consumes_no_reference() {
        let (svc, store, _) = service();
        let doc_type = job_seeker_type(&svc).await;
        let err = svc
            .file_request(NewRequest {
                applicant: applicant(),
                doc_type_id: doc_type.id,
                user_id: None,
                uploaded_file_id: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let bucket = Bucket::for_instant(RefKind::Request, Timestamp::now()).unwrap();
        assert_eq!(store.last_sequence(bucket).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn filing_issues_reference_and_persists() {
        let (svc, store, _) = service();
        let doc_type = job_seeker_type(&svc).await;
        let mut person = applicant();
        person.edu_attainment = Some("College".into());
        person.edu_course = Some("BS Nursing".into());
        let request = svc
            .file_request(NewRequest {
                applicant: person,
                doc_type_id: doc_type.id,
                user_id: None,
                uploaded_file_id: None,
            })
            .await
            .unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.reference.sequence(), 1);
        assert_eq!(store.get_request(request.id).await.unwrap(), Some(request));
    }

    #[tokio::test]
    async fn unknown_document_type_is_not_found() {
        let (svc, _, _) = service();
        let err = svc
            .file_request(NewRequest {
                applicant: applicant(),
                doc_type_id: DocumentTypeId::new(),
                user_id: None,
                uploaded_file_id: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn unknown_blob_is_validation_error() {
        let (svc, _, _) = service();
        let doc_type = svc
            .create_document_type(CatalogEntry::new("Barangay Clearance", "", []))
            .await
            .unwrap();
        let err = svc
            .file_request(NewRequest {
                applicant: applicant(),
                doc_type_id: doc_type.id,
                user_id: None,
                uploaded_file_id: Some(BlobId::new()),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn deleting_request_removes_its_blob() {
        let (svc, _, blobs) = service();
        let doc_type = svc
            .create_document_type(CatalogEntry::new("Barangay Clearance", "", []))
            .await
            .unwrap();
        let blob_id = svc
            .upload_blob(Blob {
                content_type: "image/png".into(),
                bytes: vec![1, 2, 3],
            })
            .await
            .unwrap();
        let request = svc
            .file_request(NewRequest {
                applicant: applicant(),
                doc_type_id: doc_type.id,
                user_id: None,
                uploaded_file_id: Some(blob_id),
            })
            .await
            .unwrap();

        svc.delete_request(request.id).await.unwrap();
        assert!(!blobs.exists(blob_id).await.unwrap());
        let err = svc.get_request(request.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn deleting_request_survives_missing_blob() {
        let (svc, _, blobs) = service();
        let doc_type = svc
            .create_document_type(CatalogEntry::new("Barangay Clearance", "", []))
            .await
            .unwrap();
        let blob_id = svc
            .upload_blob(Blob {
                content_type: "image/png".into(),
                bytes: vec![1],
            })
            .await
            .unwrap();
        let request = svc
            .file_request(NewRequest {
                applicant: applicant(),
                doc_type_id: doc_type.id,
                user_id: None,
                uploaded_file_id: Some(blob_id),
            })
            .await
            .unwrap();
        blobs.delete(blob_id).await.unwrap();

        assert!(svc.delete_request(request.id).await.is_ok());
    }

    #[tokio::test]
    async fn status_lookup_checks_format_and_kind() {
        let (svc, _, _) = service();
        let malformed = svc.request_status("REQ-2025-1-1").await.unwrap_err();
        assert_eq!(malformed.kind(), ErrorKind::Validation);
        let complaint_code = svc.request_status("CMPL-2025-01-00001").await.unwrap_err();
        assert_eq!(complaint_code.kind(), ErrorKind::Validation);
        let missing = svc.request_status("REQ-2025-01-00001").await.unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn approve_then_revert_is_conflict() {
        let (svc, _, _) = service();
        let doc_type = svc
            .create_document_type(CatalogEntry::new("Business Permit", "", []))
            .await
            .unwrap();
        let request = svc
            .file_request(NewRequest {
                applicant: applicant(),
                doc_type_id: doc_type.id,
                user_id: None,
                uploaded_file_id: None,
            })
            .await
            .unwrap();

        let approved = svc
            .transition_request(request.id, RequestStatus::Approved, &actor())
            .await
            .unwrap();
        assert_eq!(approved.approved_by, Some(actor()));
        assert!(approved.approved_at.is_some());

        let err = svc
            .transition_request(request.id, RequestStatus::Pending, &actor())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn complaints_get_their_own_counter() {
        let (svc, _, _) = service();
        let details = ComplaintDetails {
            reporter_name: "Lito".into(),
            contact_number: Some(" ".into()),
            address: None,
            complaint_type: "noise".into(),
            description: "Karaoke past midnight".into(),
        };
        let complaint = svc.open_complaint(details).await.unwrap();
        assert_eq!(complaint.reference.kind(), RefKind::Complaint);
        assert_eq!(complaint.reference.sequence(), 1);
        assert_eq!(complaint.details.contact_number, None);
    }

    #[tokio::test]
    async fn duplicate_document_type_name_is_conflict() {
        let (svc, _, _) = service();
        svc.create_document_type(CatalogEntry::new("Business Permit", "", []))
            .await
            .unwrap();
        let err = svc
            .create_document_type(CatalogEntry::new("  Business Permit ", "again", []))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn blank_document_type_name_is_rejected() {
        let (svc, _, _) = service();
        let err = svc
            .create_document_type(CatalogEntry::new("   ", "", []))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn update_document_type_changes_fields() {
        let (svc, _, _) = service();
        let created = svc
            .create_document_type(CatalogEntry::new("Business Permit", "old", []))
            .await
            .unwrap();
        let updated = svc
            .update_document_type(
                created.id,
                CatalogEntry::new("Business Permit", "new", [RequiredField::EduCourse]),
            )
            .await
            .unwrap();
        assert_eq!(updated.description, "new");
        assert!(updated.requires(RequiredField::EduCourse));
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn update_document_type_can_rename() {
        let (svc, _, _) = service();
        let created = svc
            .create_document_type(CatalogEntry::new("Indigency", "", []))
            .await
            .unwrap();
        let renamed = svc
            .update_document_type(created.id, CatalogEntry::new("Certificate of Indigency", "", []))
            .await
            .unwrap();
        assert_eq!(renamed.name, "Certificate of Indigency");
        let listed = svc.list_document_types().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Certificate of Indigency");
    }

    #[tokio::test]
    async fn dashboard_and_weekly_counts_follow_activity() {
        let (svc, _, _) = service();
        let doc_type = svc
            .create_document_type(CatalogEntry::new("Barangay Clearance", "", []))
            .await
            .unwrap();
        let mut filed = Vec::new();
        for _ in 0..3 {
            let request = svc
                .file_request(NewRequest {
                    applicant: applicant(),
                    doc_type_id: doc_type.id,
                    user_id: None,
                    uploaded_file_id: None,
                })
                .await
                .unwrap();
            filed.push(request);
        }
        svc.transition_request(filed[0].id, RequestStatus::Approved, &actor())
            .await
            .unwrap();
        svc.transition_request(filed[1].id, RequestStatus::Rejected, &actor())
            .await
            .unwrap();
        let complaint = svc
            .open_complaint(ComplaintDetails {
                reporter_name: "Jose".into(),
                contact_number: None,
                address: None,
                complaint_type: "flooding".into(),
                description: "Clogged drainage".into(),
            })
            .await
            .unwrap();
        svc.transition_complaint(complaint.id, ComplaintStatus::Resolved, &actor())
            .await
            .unwrap();

        assert_eq!(
            svc.dashboard().await.unwrap(),
            DashboardStats {
                total_requests: 3,
                total_complaints: 1,
                pending_requests: 1,
                approved_requests: 1,
                rejected_requests: 1,
                resolved_complaints: 1,
            }
        );

        let weekly = svc.weekly_requests(Timestamp::now()).await.unwrap();
        assert_eq!(weekly.iter().map(|d| d.count).sum::<u64>(), 3);
        assert!(weekly
            .iter()
            .all(|d| d.key.as_deref() == Some("Barangay Clearance")));

        let complaints = svc.weekly_complaints(Timestamp::now()).await.unwrap();
        assert_eq!(complaints.iter().map(|d| d.count).sum::<u64>(), 1);
        assert!(complaints
            .iter()
            .all(|d| d.key == ComplaintStatus::Resolved));
    }
}
