//! Response shapes.
//!
//! Records are stored with UTC timestamps; the views render every instant
//! at the civic offset (`+08:00`) and add derived fields such as
//! `idImageUrl`. Nothing here feeds back into storage.

use serde::Serialize;

use civic_core::{ActorId, BlobId, ComplaintId, DocumentTypeId, Reference, RequestId, Timestamp};
use civic_state::{
    Applicant, Complaint, ComplaintDetails, ComplaintStatus, DocumentRequest, DocumentType,
    RequestStatus, RequiredField, TransitionRecord,
};

use crate::blob::blob_url;
use crate::store::DailyCount;

fn civic(ts: Timestamp) -> String {
    ts.civic_display()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionView<S> {
    pub from: S,
    pub to: S,
    pub actor: ActorId,
    pub at: String,
}

impl<S: Copy> From<&TransitionRecord<S>> for TransitionView<S> {
    fn from(record: &TransitionRecord<S>) -> Self {
        Self {
            from: record.from,
            to: record.to,
            actor: record.actor.clone(),
            at: civic(record.at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
    pub id: RequestId,
    #[serde(rename = "ref")]
    pub reference: Reference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<ActorId>,
    #[serde(flatten)]
    pub applicant: Applicant,
    pub doc_type_id: DocumentTypeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_file_id: Option<BlobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_image_url: Option<String>,
    pub status: RequestStatus,
    pub approved_by: Option<ActorId>,
    pub approved_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub transitions: Vec<TransitionView<RequestStatus>>,
}

impl From<DocumentRequest> for RequestView {
    fn from(r: DocumentRequest) -> Self {
        Self {
            id: r.id,
            reference: r.reference,
            user_id: r.user_id,
            applicant: r.applicant,
            doc_type_id: r.doc_type_id,
            id_image_url: r.uploaded_file_id.map(blob_url),
            uploaded_file_id: r.uploaded_file_id,
            status: r.status,
            approved_by: r.approved_by,
            approved_at: r.approved_at.map(civic),
            created_at: civic(r.created_at),
            updated_at: civic(r.updated_at),
            transitions: r.transitions.iter().map(TransitionView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintView {
    pub id: ComplaintId,
    #[serde(rename = "ref")]
    pub reference: Reference,
    #[serde(flatten)]
    pub details: ComplaintDetails,
    pub status: ComplaintStatus,
    pub processed_by: Option<ActorId>,
    pub resolved_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub transitions: Vec<TransitionView<ComplaintStatus>>,
}

impl From<Complaint> for ComplaintView {
    fn from(c: Complaint) -> Self {
        Self {
            id: c.id,
            reference: c.reference,
            details: c.details,
            status: c.status,
            processed_by: c.processed_by,
            resolved_at: c.resolved_at.map(civic),
            created_at: civic(c.created_at),
            updated_at: civic(c.updated_at),
            transitions: c.transitions.iter().map(TransitionView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTypeView {
    pub id: DocumentTypeId,
    pub name: String,
    pub description: String,
    pub required_fields: Vec<RequiredField>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<DocumentType> for DocumentTypeView {
    fn from(d: DocumentType) -> Self {
        Self {
            id: d.id,
            name: d.name,
            description: d.description,
            required_fields: d.required_fields.into_iter().collect(),
            created_at: civic(d.created_at),
            updated_at: civic(d.updated_at),
        }
    }
}

/// One day of request activity for one document type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDayView {
    /// Civic-local date, `YYYY-MM-DD`.
    pub date: String,
    /// `null` when the document type has since been removed.
    pub doc_type: Option<String>,
    pub count: u64,
}

impl From<DailyCount<Option<String>>> for RequestDayView {
    fn from(d: DailyCount<Option<String>>) -> Self {
        Self {
            date: d.day.format("%Y-%m-%d").to_string(),
            doc_type: d.key,
            count: d.count,
        }
    }
}

/// One day of complaint activity for one status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintDayView {
    pub date: String,
    pub status: ComplaintStatus,
    pub count: u64,
}

impl From<DailyCount<ComplaintStatus>> for ComplaintDayView {
    fn from(d: DailyCount<ComplaintStatus>) -> Self {
        Self {
            date: d.day.format("%Y-%m-%d").to_string(),
            status: d.key,
            count: d.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_core::{Bucket, RefKind};
    use civic_state::CatalogEntry;

    fn filed(blob: Option<BlobId>) -> DocumentRequest {
        let doc_type = DocumentType::from_entry(
            &CatalogEntry::new("Barangay Clearance", "", []),
            Timestamp::now(),
        );
        let applicant = Applicant {
            full_name: "Ana Reyes".into(),
            contact_number: "0917".into(),
            address: "Purok 1".into(),
            purpose: "Travel".into(),
            age: 30,
            marital_status: Some("single".into()),
            edu_attainment: None,
            edu_course: None,
        };
        let reference = Bucket::new(RefKind::Request, 2025, 1)
            .unwrap()
            .reference(7)
            .unwrap();
        DocumentRequest::file(
            reference,
            applicant.verify_for(&doc_type).unwrap(),
            None,
            blob,
            Timestamp::parse("2025-01-15T10:00:00Z").unwrap(),
        )
    }

    #[test]
    fn request_view_renders_civic_time_and_wire_names() {
        let json = serde_json::to_value(RequestView::from(filed(None))).unwrap();
        assert_eq!(json["ref"], "REQ-2025-01-00007");
        assert_eq!(json["createdAt"], "2025-01-15T18:00:00+08:00");
        assert_eq!(json["fullName"], "Ana Reyes");
        assert_eq!(json["maritalStatus"], "single");
        assert_eq!(json["status"], "pending");
        assert!(json["approvedAt"].is_null());
        assert!(json.get("idImageUrl").is_none());
    }

    #[test]
    fn request_view_links_uploaded_image() {
        let blob = BlobId::new();
        let json = serde_json::to_value(RequestView::from(filed(Some(blob)))).unwrap();
        assert_eq!(
            json["idImageUrl"],
            format!("/api/files/{}", blob.as_uuid())
        );
    }

    #[test]
    fn transition_history_uses_civic_time() {
        let mut request = filed(None);
        let staff = ActorId::new("staff-1").unwrap();
        request
            .transition(
                RequestStatus::Approved,
                &staff,
                Timestamp::parse("2025-01-16T23:30:00Z").unwrap(),
            )
            .unwrap();
        let json = serde_json::to_value(RequestView::from(request)).unwrap();
        assert_eq!(json["approvedBy"], "staff-1");
        assert_eq!(json["approvedAt"], "2025-01-17T07:30:00+08:00");
        assert_eq!(json["transitions"][0]["from"], "pending");
        assert_eq!(json["transitions"][0]["to"], "approved");
        assert_eq!(json["transitions"][0]["at"], "2025-01-17T07:30:00+08:00");
    }

    #[test]
    fn document_type_view_lists_required_fields() {
        let doc_type = DocumentType::from_entry(
            &CatalogEntry::new(
                "First-time Job Seeker",
                "",
                [RequiredField::EduCourse, RequiredField::EduAttainment],
            ),
            Timestamp::parse("2025-01-01T00:00:00Z").unwrap(),
        );
        let json = serde_json::to_value(DocumentTypeView::from(doc_type)).unwrap();
        assert_eq!(
            json["requiredFields"],
            serde_json::json!(["eduAttainment", "eduCourse"])
        );
        assert_eq!(json["createdAt"], "2025-01-01T08:00:00+08:00");
    }

    #[test]
    fn day_views_render_date_and_keys() {
        let day = chrono::NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();
        let json = serde_json::to_value(RequestDayView::from(DailyCount {
            day,
            key: None,
            count: 2,
        }))
        .unwrap();
        assert_eq!(json, serde_json::json!({"date": "2025-01-09", "docType": null, "count": 2}));

        let json = serde_json::to_value(ComplaintDayView::from(DailyCount {
            day,
            key: ComplaintStatus::InProgress,
            count: 1,
        }))
        .unwrap();
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["date"], "2025-01-09");
    }
}
