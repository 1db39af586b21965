//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier in the civic stack. These prevent
//! accidental identifier confusion: a `ComplaintId` cannot be passed where a
//! `RequestId` is expected, and a staff actor id cannot be mistaken for a
//! storage key.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CivicError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $ty:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $ty(Uuid);

        impl $ty {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $ty {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_id!(
    /// Storage identifier of a resident's document request.
    RequestId,
    "request"
);

uuid_id!(
    /// Storage identifier of a complaint.
    ComplaintId,
    "complaint"
);

uuid_id!(
    /// Storage identifier of a document type in the catalog.
    DocumentTypeId,
    "doctype"
);

uuid_id!(
    /// Identifier of an externally stored blob (the applicant's ID image).
    BlobId,
    "blob"
);

/// Identifier of the staff member (or other caller) performing an action.
///
/// Actor ids come from the authentication layer and are recorded verbatim in
/// audit fields. They must be non-empty and at most 128 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    /// Maximum accepted length of an actor id.
    pub const MAX_LEN: usize = 128;

    /// Create a validated actor id.
    pub fn new(raw: impl Into<String>) -> Result<Self, CivicError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CivicError::Validation("actor id must not be empty".into()));
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(CivicError::Validation(format!(
                "actor id must not exceed {} characters",
                Self::MAX_LEN
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Return the actor id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ActorId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
        assert_ne!(ComplaintId::new(), ComplaintId::new());
    }

    #[test]
    fn display_carries_namespace() {
        let id = Uuid::nil();
        assert_eq!(
            RequestId::from_uuid(id).to_string(),
            "request:00000000-0000-0000-0000-000000000000"
        );
        assert!(ComplaintId::from_uuid(id).to_string().starts_with("complaint:"));
        assert!(DocumentTypeId::from_uuid(id).to_string().starts_with("doctype:"));
    }

    #[test]
    fn uuid_ids_serialize_as_bare_uuid() {
        let id = RequestId::from_uuid(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }

    #[test]
    fn actor_id_trims_and_validates() {
        let actor = ActorId::new("  clerk-7 ").unwrap();
        assert_eq!(actor.as_str(), "clerk-7");
        assert!(ActorId::new("   ").is_err());
        assert!(ActorId::new("x".repeat(ActorId::MAX_LEN + 1)).is_err());
    }

    #[test]
    fn actor_id_deserialize_rejects_empty() {
        assert!(serde_json::from_str::<ActorId>("\"\"").is_err());
        let actor: ActorId = serde_json::from_str("\"staff-1\"").unwrap();
        assert_eq!(actor.as_str(), "staff-1");
    }
}
