//! # Document Type Catalog
//!
//! The document types residents may request, and the catalog that seeds
//! them at startup.
//!
//! ## Seeding Policy
//!
//! Steady-state seeding is an idempotent upsert keyed by `name`:
//!
//! - absent entries are created;
//! - present entries get `description` and `requiredFields` set from the
//!   catalog, and are written only when something differs;
//! - entries not named by the catalog are never touched.
//!
//! Removing retired types is a separate, explicitly invoked migration (see
//! [`LEGACY_DOCUMENT_TYPES`]), never a side effect of seeding.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use civic_core::{DocumentTypeId, Timestamp};

/// Document types removed by the one-time legacy migration.
///
/// `First Time Job Seeker Form` was superseded by `First-time Job Seeker`,
/// which carries education requirements.
pub const LEGACY_DOCUMENT_TYPES: &[&str] = &["First Time Job Seeker Form"];

/// Applicant fields a document type may make mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RequiredField {
    /// Highest educational attainment.
    #[serde(rename = "eduAttainment")]
    EduAttainment,
    /// Course or degree.
    #[serde(rename = "eduCourse")]
    EduCourse,
}

impl RequiredField {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EduAttainment => "eduAttainment",
            Self::EduCourse => "eduCourse",
        }
    }

    /// Parse a wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "eduAttainment" => Some(Self::EduAttainment),
            "eduCourse" => Some(Self::EduCourse),
            _ => None,
        }
    }
}

impl std::fmt::Display for RequiredField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentType {
    pub id: DocumentTypeId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub required_fields: BTreeSet<RequiredField>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DocumentType {
    /// Create a new document type from a catalog entry.
    pub fn from_entry(entry: &CatalogEntry, now: Timestamp) -> Self {
        Self {
            id: DocumentTypeId::new(),
            name: entry.name.clone(),
            description: entry.description.clone(),
            required_fields: entry.required_fields.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the stored values already equal the entry's.
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        self.description == entry.description && self.required_fields == entry.required_fields
    }

    /// Set description and required fields from the entry.
    ///
    /// Returns `false` (and leaves `updated_at` alone) when nothing differs.
    pub fn apply(&mut self, entry: &CatalogEntry, now: Timestamp) -> bool {
        if self.matches(entry) {
            return false;
        }
        self.description = entry.description.clone();
        self.required_fields = entry.required_fields.clone();
        self.updated_at = now;
        true
    }

    pub fn requires(&self, field: RequiredField) -> bool {
        self.required_fields.contains(&field)
    }
}

/// One entry of the seed catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_fields: BTreeSet<RequiredField>,
}

impl CatalogEntry {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        required_fields: impl IntoIterator<Item = RequiredField>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required_fields: required_fields.into_iter().collect(),
        }
    }
}

/// Errors loading or validating a catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// An entry has an empty name.
    #[error("catalog entry {index} has an empty name")]
    EmptyName {
        /// Position in the catalog.
        index: usize,
    },

    /// Two entries share a name.
    #[error("catalog lists {0:?} more than once")]
    DuplicateName(String),

    /// YAML could not be parsed.
    #[error("invalid catalog YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<CatalogError> for civic_core::CivicError {
    fn from(err: CatalogError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// An ordered, validated list of catalog entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build a catalog, rejecting empty or duplicate names.
    ///
    /// Names are trimmed; uniqueness is checked on the trimmed value.
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        let mut cleaned = Vec::with_capacity(entries.len());
        for (index, mut entry) in entries.into_iter().enumerate() {
            entry.name = entry.name.trim().to_string();
            if entry.name.is_empty() {
                return Err(CatalogError::EmptyName { index });
            }
            if !seen.insert(entry.name.clone()) {
                return Err(CatalogError::DuplicateName(entry.name));
            }
            cleaned.push(entry);
        }
        Ok(Self { entries: cleaned })
    }

    /// Parse a YAML list of entries:
    ///
    /// ```yaml
    /// - name: Barangay Clearance
    ///   description: Document certifying residency and good moral character
    /// - name: First-time Job Seeker
    ///   requiredFields: [eduAttainment, eduCourse]
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let entries: Vec<CatalogEntry> = serde_yaml::from_str(yaml)?;
        Self::new(entries)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Catalog {
    /// The built-in barangay catalog.
    fn default() -> Self {
        Self {
            entries: vec![
                CatalogEntry::new(
                    "Barangay Clearance",
                    "Document certifying residency and good moral character",
                    [],
                ),
                CatalogEntry::new(
                    "Business Permit",
                    "License to operate a business in the barangay",
                    [],
                ),
                CatalogEntry::new(
                    "Certificate of Indigency",
                    "Document certifying poor economic status",
                    [],
                ),
                CatalogEntry::new(
                    "First-time Job Seeker",
                    "Form for first-time job seekers (RA 11261)",
                    [RequiredField::EduAttainment, RequiredField::EduCourse],
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Timestamp {
        Timestamp::parse("2025-01-15T10:00:00Z").unwrap()
    }

    #[test]
    fn default_catalog_has_four_types() {
        let catalog = Catalog::default();
        assert_eq!(catalog.len(), 4);
        let job_seeker = catalog
            .entries()
            .iter()
            .find(|e| e.name == "First-time Job Seeker")
            .unwrap();
        assert!(job_seeker.required_fields.contains(&RequiredField::EduAttainment));
        assert!(job_seeker.required_fields.contains(&RequiredField::EduCourse));
    }

    #[test]
    fn default_catalog_excludes_legacy_names() {
        let catalog = Catalog::default();
        for legacy in LEGACY_DOCUMENT_TYPES {
            assert!(catalog.entries().iter().all(|e| e.name != *legacy));
        }
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Catalog::new(vec![
            CatalogEntry::new("Business Permit", "a", []),
            CatalogEntry::new(" Business Permit ", "b", []),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateName(n) if n == "Business Permit"));
    }

    #[test]
    fn rejects_empty_names() {
        let err = Catalog::new(vec![CatalogEntry::new("  ", "x", [])]).unwrap_err();
        assert!(matches!(err, CatalogError::EmptyName { index: 0 }));
    }

    #[test]
    fn parses_yaml() {
        let yaml = r#"
- name: Barangay Clearance
  description: Residency certificate
- name: First-time Job Seeker
  requiredFields: [eduAttainment, eduCourse]
"#;
        let catalog = Catalog::from_yaml(yaml).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries()[0].description, "Residency certificate");
        assert_eq!(catalog.entries()[1].required_fields.len(), 2);
    }

    #[test]
    fn yaml_rejects_unknown_required_field() {
        let yaml = "- name: X\n  requiredFields: [shoeSize]\n";
        assert!(matches!(Catalog::from_yaml(yaml), Err(CatalogError::Yaml(_))));
    }

    #[test]
    fn apply_is_noop_when_equal() {
        let entry = CatalogEntry::new("Business Permit", "License", []);
        let mut dt = DocumentType::from_entry(&entry, now());
        let later = Timestamp::parse("2025-02-01T00:00:00Z").unwrap();
        assert!(!dt.apply(&entry, later));
        assert_eq!(dt.updated_at, now());
    }

    #[test]
    fn apply_updates_description_and_fields() {
        let mut dt =
            DocumentType::from_entry(&CatalogEntry::new("First-time Job Seeker", "old", []), now());
        let entry = CatalogEntry::new(
            "First-time Job Seeker",
            "new",
            [RequiredField::EduAttainment],
        );
        let later = Timestamp::parse("2025-02-01T00:00:00Z").unwrap();
        assert!(dt.apply(&entry, later));
        assert_eq!(dt.description, "new");
        assert!(dt.requires(RequiredField::EduAttainment));
        assert!(!dt.requires(RequiredField::EduCourse));
        assert_eq!(dt.updated_at, later);
    }

    #[test]
    fn required_field_wire_names() {
        assert_eq!(RequiredField::EduAttainment.as_str(), "eduAttainment");
        assert_eq!(RequiredField::parse("eduCourse"), Some(RequiredField::EduCourse));
        assert_eq!(RequiredField::parse("edu_course"), None);
        assert_eq!(
            serde_json::to_string(&RequiredField::EduCourse).unwrap(),
            "\"eduCourse\""
        );
    }
}
