//! # Intake Validation
//!
//! Resident-supplied input for new requests and complaints, and the checks
//! it must pass before a reference code is allocated.
//!
//! Validation produces a verified token ([`VerifiedApplication`],
//! [`VerifiedComplaint`]). The entity constructors only accept those tokens,
//! so a reference can never be spent on input that later fails validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use civic_core::{CivicError, DocumentTypeId};

use crate::catalog::{DocumentType, RequiredField};

/// Oldest accepted applicant age.
pub const MAX_AGE: u16 = 150;

/// Longest accepted free-text field.
pub const MAX_TEXT_LEN: usize = 2_000;

/// Reasons intake input is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    /// A required field is missing or blank.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field exceeds [`MAX_TEXT_LEN`].
    #[error("field {0} exceeds {MAX_TEXT_LEN} characters")]
    TooLong(&'static str),

    /// Age outside `1..=MAX_AGE`.
    #[error("age {0} is out of range 1..={MAX_AGE}")]
    AgeOutOfRange(u16),

    /// The document type makes a field mandatory and it was not supplied.
    #[error("{doc_type} requires field {field}")]
    RequiredByDocumentType {
        /// Document type name.
        doc_type: String,
        /// The missing field.
        field: RequiredField,
    },
}

impl From<IntakeError> for CivicError {
    fn from(err: IntakeError) -> Self {
        Self::Validation(err.to_string())
    }
}

fn require(field: &'static str, value: &str) -> Result<(), IntakeError> {
    if value.trim().is_empty() {
        return Err(IntakeError::MissingField(field));
    }
    check_len(field, value)
}

fn check_len(field: &'static str, value: &str) -> Result<(), IntakeError> {
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(IntakeError::TooLong(field));
    }
    Ok(())
}

fn check_optional(field: &'static str, value: &Option<String>) -> Result<(), IntakeError> {
    match value {
        Some(v) => check_len(field, v),
        None => Ok(()),
    }
}

/// Normalize an optional field: blank strings become `None`.
fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ─── Document request applicant ──────────────────────────────────────

/// Applicant details on a document request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    pub full_name: String,
    pub contact_number: String,
    pub address: String,
    pub purpose: String,
    pub age: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edu_attainment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edu_course: Option<String>,
}

impl Applicant {
    /// Value supplied for a conditionally required field, if non-blank.
    pub fn field_value(&self, field: RequiredField) -> Option<&str> {
        let value = match field {
            RequiredField::EduAttainment => self.edu_attainment.as_deref(),
            RequiredField::EduCourse => self.edu_course.as_deref(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Validate against the referenced document type.
    ///
    /// Checks the always-required fields first, then the fields
    /// `doc_type.required_fields` makes mandatory.
    pub fn verify_for(mut self, doc_type: &DocumentType) -> Result<VerifiedApplication, IntakeError> {
        require("fullName", &self.full_name)?;
        require("contactNumber", &self.contact_number)?;
        require("address", &self.address)?;
        require("purpose", &self.purpose)?;
        if self.age == 0 || self.age > MAX_AGE {
            return Err(IntakeError::AgeOutOfRange(self.age));
        }
        check_optional("maritalStatus", &self.marital_status)?;
        check_optional("eduAttainment", &self.edu_attainment)?;
        check_optional("eduCourse", &self.edu_course)?;

        for field in &doc_type.required_fields {
            if self.field_value(*field).is_none() {
                return Err(IntakeError::RequiredByDocumentType {
                    doc_type: doc_type.name.clone(),
                    field: *field,
                });
            }
        }

        self.full_name = self.full_name.trim().to_string();
        self.contact_number = self.contact_number.trim().to_string();
        self.address = self.address.trim().to_string();
        self.purpose = self.purpose.trim().to_string();
        self.marital_status = blank_to_none(self.marital_status);
        self.edu_attainment = blank_to_none(self.edu_attainment);
        self.edu_course = blank_to_none(self.edu_course);

        Ok(VerifiedApplication {
            applicant: self,
            doc_type_id: doc_type.id,
        })
    }
}

/// An applicant that passed validation against a specific document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedApplication {
    applicant: Applicant,
    doc_type_id: DocumentTypeId,
}

impl VerifiedApplication {
    pub fn applicant(&self) -> &Applicant {
        &self.applicant
    }

    pub fn doc_type_id(&self) -> DocumentTypeId {
        self.doc_type_id
    }

    pub(crate) fn into_parts(self) -> (Applicant, DocumentTypeId) {
        (self.applicant, self.doc_type_id)
    }
}

// ─── Complaint details ───────────────────────────────────────────────

/// Details of a complaint as encoded by staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintDetails {
    pub reporter_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub complaint_type: String,
    pub description: String,
}

impl ComplaintDetails {
    pub fn verify(mut self) -> Result<VerifiedComplaint, IntakeError> {
        require("reporterName", &self.reporter_name)?;
        require("complaintType", &self.complaint_type)?;
        require("description", &self.description)?;
        check_optional("contactNumber", &self.contact_number)?;
        check_optional("address", &self.address)?;

        self.reporter_name = self.reporter_name.trim().to_string();
        self.complaint_type = self.complaint_type.trim().to_string();
        self.description = self.description.trim().to_string();
        self.contact_number = blank_to_none(self.contact_number);
        self.address = blank_to_none(self.address);
        Ok(VerifiedComplaint { details: self })
    }
}

/// Complaint details that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedComplaint {
    details: ComplaintDetails,
}

impl VerifiedComplaint {
    pub fn details(&self) -> &ComplaintDetails {
        &self.details
    }

    pub(crate) fn into_details(self) -> ComplaintDetails {
        self.details
    }
}
