//! # Catalog Subcommands
//!
//! `civic seed` brings the stored document types in line with a catalog
//! (upsert by name, never deleting). `civic migrate legacy-doc-types`
//! removes the retired types; it is safe to run more than once.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use civic_api::seed::{drop_legacy_document_types, ensure_seeded, load_catalog, SeedReport};
use civic_api::store::CivicStore;

use crate::require_store;

/// Arguments for `civic seed`.
#[derive(Args, Debug)]
pub struct SeedArgs {
    /// YAML catalog to apply. The built-in catalog is used when omitted.
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

/// Arguments for `civic migrate`.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub command: MigrateCommand,
}

#[derive(Subcommand, Debug)]
pub enum MigrateCommand {
    /// Delete document types retired from the catalog.
    LegacyDocTypes,
}

/// Seed `store` from the catalog at `path` (or the built-in one).
pub async fn seed_store(store: &dyn CivicStore, path: Option<&std::path::Path>) -> Result<SeedReport> {
    let catalog = load_catalog(path)?;
    ensure_seeded(store, &catalog)
        .await
        .context("seeding document types failed")
}

pub async fn run_seed(args: &SeedArgs) -> Result<u8> {
    let store = require_store().await?;
    let report = seed_store(&store, args.catalog.as_deref()).await?;
    println!("document types: {report}");
    Ok(0)
}

pub async fn run_migrate(args: &MigrateArgs) -> Result<u8> {
    let store = require_store().await?;
    match args.command {
        MigrateCommand::LegacyDocTypes => {
            let removed = drop_legacy_document_types(&store)
                .await
                .context("removing legacy document types failed")?;
            println!("legacy document types removed: {removed}");
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_api::store::MemoryStore;

    #[tokio::test]
    async fn seeding_twice_creates_nothing_new() {
        let store = MemoryStore::new();
        let first = seed_store(&store, None).await.unwrap();
        assert_eq!(first.created, 4);
        let second = seed_store(&store, None).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.unchanged, 4);
        assert!(!second.changed());
    }

    #[tokio::test]
    async fn seeds_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(
            &path,
            "- name: Cedula\n  description: Community tax certificate\n",
        )
        .unwrap();

        let store = MemoryStore::new();
        let report = seed_store(&store, Some(&path)).await.unwrap();
        assert_eq!(report.created, 1);
        let names: Vec<String> = store
            .list_document_types()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Cedula".to_string()]);
    }

    #[tokio::test]
    async fn missing_catalog_file_is_an_error() {
        let store = MemoryStore::new();
        let err = seed_store(&store, Some(std::path::Path::new("/nonexistent/catalog.yaml")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot read catalog"));
    }
}
