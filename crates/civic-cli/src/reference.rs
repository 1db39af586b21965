//! # Reference Subcommands
//!
//! - `parse` decodes a code into kind, bucket and sequence.
//! - `next` shows the bucket a code issued at `--at` (default: now) would
//!   fall into. With `DATABASE_URL` set it also reads the bucket's counter
//!   and prints the code the next filing would receive. Nothing is
//!   consumed.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};

use civic_api::allocator::{ReferenceAllocator, RetryPolicy};
use civic_api::store::CivicStore;
use civic_core::{Bucket, RefKind, Reference, Timestamp};

use crate::{connect_store, database_url};

/// Arguments for `civic ref`.
#[derive(Args, Debug)]
pub struct RefArgs {
    #[command(subcommand)]
    pub command: RefCommand,
}

#[derive(Subcommand, Debug)]
pub enum RefCommand {
    /// Decode a reference code such as REQ-2025-01-00042.
    Parse {
        /// The code to decode.
        code: String,
    },

    /// Preview the next code for a kind.
    Next {
        /// Entity kind.
        #[arg(value_enum)]
        kind: KindArg,
        /// Instant to bucket, RFC 3339. Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Request,
    Complaint,
}

impl From<KindArg> for RefKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Request => RefKind::Request,
            KindArg::Complaint => RefKind::Complaint,
        }
    }
}

/// Human-readable breakdown of a reference code.
pub fn describe(code: &str) -> Result<String> {
    let reference = Reference::parse(code.trim())
        .with_context(|| format!("{code:?} is not a valid reference code"))?;
    let bucket = reference.bucket();
    Ok(format!(
        "kind:     {}\nyear:     {}\nmonth:    {:02}\nsequence: {}",
        bucket.kind().as_str(),
        bucket.year(),
        bucket.month(),
        reference.sequence()
    ))
}

/// `at` parsed as RFC 3339, or the current instant.
pub fn instant(at: Option<&str>) -> Result<Timestamp> {
    match at {
        Some(raw) => {
            Timestamp::parse(raw).with_context(|| format!("{raw:?} is not an RFC 3339 instant"))
        }
        None => Ok(Timestamp::now()),
    }
}

/// Code the next filing of `kind` at `at` would receive.
pub async fn peek_next(
    store: Arc<dyn CivicStore>,
    kind: KindArg,
    at: Timestamp,
) -> Result<Reference> {
    let allocator = ReferenceAllocator::new(store, RetryPolicy::default());
    allocator
        .peek(kind.into(), at)
        .await
        .context("reading the reference counter failed")
}

pub async fn run_ref(args: &RefArgs) -> Result<u8> {
    match &args.command {
        RefCommand::Parse { code } => {
            println!("{}", describe(code)?);
        }
        RefCommand::Next { kind, at } => {
            let at = instant(at.as_deref())?;
            let bucket = Bucket::for_instant((*kind).into(), at)?;
            println!("bucket: {}", bucket.code_prefix());
            match database_url() {
                Some(url) => {
                    let store = Arc::new(connect_store(&url).await?);
                    println!("next:   {}", peek_next(store, *kind, at).await?);
                }
                None => tracing::info!("DATABASE_URL not set; counter not consulted"),
            }
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_api::store::MemoryStore;

    #[test]
    fn describes_request_code() {
        let text = describe("REQ-2025-01-00042").unwrap();
        assert!(text.contains("kind:     request"));
        assert!(text.contains("year:     2025"));
        assert!(text.contains("month:    01"));
        assert!(text.contains("sequence: 42"));
    }

    #[test]
    fn rejects_malformed_code() {
        let err = describe("REQ-25-1-42").unwrap_err();
        assert!(err.to_string().contains("not a valid reference code"));
    }

    #[test]
    fn instant_parses_rfc3339() {
        let at = instant(Some("2025-01-31T20:00:00Z")).unwrap();
        let bucket = Bucket::for_instant(KindArg::Request.into(), at).unwrap();
        assert_eq!((bucket.year(), bucket.month()), (2025, 2));
        assert_eq!(bucket.kind(), RefKind::Request);
    }

    #[test]
    fn rejects_bad_instant() {
        assert!(instant(Some("yesterday")).is_err());
    }

    #[tokio::test]
    async fn peek_reads_counter_without_consuming() {
        let store = Arc::new(MemoryStore::new());
        let at = instant(Some("2025-03-10T00:00:00Z")).unwrap();
        let bucket = Bucket::for_instant(RefKind::Complaint, at).unwrap();
        store.next_sequence(bucket).await.unwrap();

        let next = peek_next(store.clone(), KindArg::Complaint, at).await.unwrap();
        assert_eq!(next.to_code(), "CMPL-2025-03-00002");
        assert_eq!(peek_next(store, KindArg::Complaint, at).await.unwrap(), next);
    }
}
