//! # civic-core — Foundational Types for the Civic Services Stack
//!
//! This crate is the leaf of the workspace. It defines the primitives every
//! other crate shares: identifier newtypes, the UTC-only [`Timestamp`], the
//! human-readable [`Reference`] code format, and the error taxonomy.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `RequestId`, `ComplaintId`,
//!    `DocumentTypeId`, `BlobId`, `ActorId`. You cannot pass a complaint id
//!    where a request id is expected.
//!
//! 2. **UTC at rest, civic offset at the edge.** `Timestamp` always holds a
//!    UTC instant. The fixed UTC+8 civic offset is applied only by
//!    [`Timestamp::civic_display`] and when deriving a reference bucket.
//!
//! 3. **Fixed-width reference codes.** `REQ-YYYY-MM-NNNNN` and
//!    `CMPL-YYYY-MM-NNNNN` are parsed and rendered by one type. The sequence
//!    is always five digits so lexicographic order equals numeric order.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `civic-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod reference;
pub mod temporal;

pub use error::{CivicError, ErrorKind};
pub use identity::{ActorId, BlobId, ComplaintId, DocumentTypeId, RequestId};
pub use reference::{Bucket, RefKind, Reference, ReferenceError, MAX_SEQUENCE};
pub use temporal::{civic_offset, Timestamp, CIVIC_OFFSET_HOURS};
