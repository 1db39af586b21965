//! # Catalog Bootstrap
//!
//! Brings the stored document types in line with the catalog at startup.
//!
//! ## Sequence
//!
//! 1. **Load Catalog**: YAML file from `CATALOG_PATH`, or the built-in list.
//! 2. **Upsert by name**: each entry is created, updated, or left alone.
//! 3. **Report**: counts are logged and returned.
//!
//! Entries the catalog does not name are never touched. Retired types are
//! removed only by [`drop_legacy_document_types`], which the operator runs
//! explicitly.

use std::path::{Path, PathBuf};

use civic_core::Timestamp;
use civic_state::{Catalog, CatalogError, LEGACY_DOCUMENT_TYPES};

use crate::store::{CivicStore, StoreError, UpsertOutcome};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors loading a catalog file.
#[derive(Debug, thiserror::Error)]
pub enum CatalogLoadError {
    #[error("cannot read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog {path} is invalid: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: CatalogError,
    },
}

/// Load the catalog from `path`, or the built-in catalog when `None`.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog, CatalogLoadError> {
    let Some(path) = path else {
        return Ok(Catalog::default());
    };
    let yaml = std::fs::read_to_string(path).map_err(|source| CatalogLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let catalog = Catalog::from_yaml(&yaml).map_err(|source| CatalogLoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), entries = catalog.len(), "catalog loaded");
    Ok(catalog)
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// What one seeding pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl SeedReport {
    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.created += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }

    /// Whether the pass wrote anything.
    pub fn changed(&self) -> bool {
        self.created + self.updated > 0
    }
}

impl std::fmt::Display for SeedReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} unchanged",
            self.created, self.updated, self.unchanged
        )
    }
}

/// Upsert every catalog entry by name. Safe to run repeatedly.
pub async fn ensure_seeded(
    store: &dyn CivicStore,
    catalog: &Catalog,
) -> Result<SeedReport, StoreError> {
    let now = Timestamp::now();
    let mut report = SeedReport::default();
    for entry in catalog.entries() {
        let outcome = store.upsert_document_type(entry, now).await?;
        if outcome != UpsertOutcome::Unchanged {
            tracing::debug!(name = %entry.name, ?outcome, "document type seeded");
        }
        report.record(outcome);
    }
    tracing::info!(
        created = report.created,
        updated = report.updated,
        unchanged = report.unchanged,
        "document type catalog seeded"
    );
    Ok(report)
}

/// One-time migration: delete the retired document types.
///
/// Returns how many were removed.
pub async fn drop_legacy_document_types(store: &dyn CivicStore) -> Result<usize, StoreError> {
    let mut removed = 0;
    for name in LEGACY_DOCUMENT_TYPES {
        if store.delete_document_type_by_name(name).await? {
            tracing::info!(name, "legacy document type removed");
            removed += 1;
        }
    }
    if removed == 0 {
        tracing::info!("no legacy document types present");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use civic_state::{CatalogEntry, RequiredField};

    use crate::store::MemoryStore;

    #[tokio::test]
    async fn seeding_twice_creates_no_duplicates() {
        let store = MemoryStore::new();
        let catalog = Catalog::default();

        let first = ensure_seeded(&store, &catalog).await.unwrap();
        assert_eq!(first.created, catalog.len());
        assert!(first.changed());

        let second = ensure_seeded(&store, &catalog).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 0);
        assert_eq!(second.unchanged, catalog.len());
        assert!(!second.changed());

        assert_eq!(store.list_document_types().await.unwrap().len(), catalog.len());
    }

    #[tokio::test]
    async fn seeding_updates_changed_entries() {
        let store = MemoryStore::new();
        let old = Catalog::new(vec![CatalogEntry::new("First-time Job Seeker", "", [])]).unwrap();
        ensure_seeded(&store, &old).await.unwrap();

        let new = Catalog::new(vec![CatalogEntry::new(
            "First-time Job Seeker",
            "",
            [RequiredField::EduAttainment, RequiredField::EduCourse],
        )])
        .unwrap();
        let report = ensure_seeded(&store, &new).await.unwrap();
        assert_eq!(report.updated, 1);

        let stored = store.list_document_types().await.unwrap();
        assert!(stored[0].requires(RequiredField::EduCourse));
    }

    #[tokio::test]
    async fn seeding_leaves_unlisted_entries_alone() {
        let store = MemoryStore::new();
        let legacy = Catalog::new(vec![CatalogEntry::new("First Time Job Seeker Form", "", [])])
            .unwrap();
        ensure_seeded(&store, &legacy).await.unwrap();
        ensure_seeded(&store, &Catalog::default()).await.unwrap();

        let names: Vec<String> = store
            .list_document_types()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert!(names.iter().any(|n| n == "First Time Job Seeker Form"));
    }

    #[tokio::test]
    async fn legacy_migration_removes_only_retired_types() {
        let store = MemoryStore::new();
        let legacy = Catalog::new(vec![CatalogEntry::new("First Time Job Seeker Form", "", [])])
            .unwrap();
        ensure_seeded(&store, &legacy).await.unwrap();
        ensure_seeded(&store, &Catalog::default()).await.unwrap();

        assert_eq!(drop_legacy_document_types(&store).await.unwrap(), 1);
        assert_eq!(drop_legacy_document_types(&store).await.unwrap(), 0);
        assert_eq!(
            store.list_document_types().await.unwrap().len(),
            Catalog::default().len()
        );
    }

    #[test]
    fn default_catalog_when_no_path() {
        let catalog = load_catalog(None).unwrap();
        assert_eq!(catalog, Catalog::default());
    }

    #[test]
    fn loads_catalog_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "- name: Barangay ID\n  description: Resident identification card\n- name: Cedula"
        )
        .unwrap();
        let catalog = load_catalog(Some(file.path())).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries()[1].name, "Cedula");
    }

    #[test]
    fn missing_catalog_file_is_io_error() {
        let err = load_catalog(Some(Path::new("/nonexistent/catalog.yaml"))).unwrap_err();
        assert!(matches!(err, CatalogLoadError::Io { .. }));
    }

    #[test]
    fn duplicate_names_in_file_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "- name: Cedula\n- name: Cedula").unwrap();
        let err = load_catalog(Some(file.path())).unwrap_err();
        assert!(matches!(err, CatalogLoadError::Invalid { .. }));
    }
}
