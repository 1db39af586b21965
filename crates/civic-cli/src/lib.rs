//! # civic-cli — Operator CLI for the Civic Services Stack
//!
//! Provides the `civic` command-line interface.
//!
//! ## Subcommands
//!
//! - `civic seed`: Upsert the document type catalog into storage.
//! - `civic migrate legacy-doc-types`: Remove retired document types.
//! - `civic ref parse`: Decode a reference code.
//! - `civic ref next`: Preview the next code of a bucket.
//!
//! ```bash
//! DATABASE_URL=postgres://… civic seed --catalog catalog.yaml
//! DATABASE_URL=postgres://… civic migrate legacy-doc-types
//! civic ref parse REQ-2025-01-00042
//! civic ref next request --at 2025-01-31T20:00:00Z
//! ```

pub mod catalog;
pub mod reference;

use anyhow::{Context, Result};

use civic_api::db::{self, PgStore};

/// Connection string for the storage commands.
pub fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Connect to PostgreSQL and apply pending migrations.
pub async fn connect_store(url: &str) -> Result<PgStore> {
    let pool = db::init_pool(url)
        .await
        .context("failed to connect to DATABASE_URL")?;
    Ok(PgStore::new(pool))
}

/// Like [`connect_store`], but fails when `DATABASE_URL` is unset.
pub async fn require_store() -> Result<PgStore> {
    let url = database_url().context("DATABASE_URL must be set for storage commands")?;
    connect_store(&url).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_modules_are_accessible() {
        let _ = std::any::type_name::<catalog::SeedArgs>();
        let _ = std::any::type_name::<catalog::MigrateArgs>();
        let _ = std::any::type_name::<reference::RefArgs>();
    }
}
