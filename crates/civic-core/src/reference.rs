//! # Reference Codes
//!
//! Human-readable reference codes issued to requests and complaints:
//!
//! ```text
//! REQ-2025-01-00001
//! CMPL-2025-01-00042
//! └┬─┘ └┬─┘ └┬┘ └─┬─┘
//!  │    │    │    └── sequence within the bucket, 5 digits, zero-padded
//!  │    │    └─────── month at the civic offset (01-12)
//!  │    └──────────── year at the civic offset
//!  └───────────────── kind prefix
//! ```
//!
//! Residents quote these codes back in status lookups, so the rendering is a
//! wire contract. The sequence is fixed-width: the lexicographic order of two
//! codes in one bucket must equal their numeric order.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::temporal::Timestamp;

/// Largest sequence representable in the five-digit field.
pub const MAX_SEQUENCE: u32 = 99_999;

/// Width of the zero-padded sequence field.
const SEQUENCE_WIDTH: usize = 5;

/// Errors parsing or constructing reference codes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// The string is not a reference code.
    #[error("malformed reference code: {0:?}")]
    Malformed(String),

    /// Unknown prefix.
    #[error("unknown reference prefix: {0:?}")]
    UnknownPrefix(String),

    /// Month outside 01-12 or year outside four digits.
    #[error("invalid reference period {year:04}-{month:02}")]
    InvalidPeriod {
        /// Parsed year.
        year: i32,
        /// Parsed month.
        month: u32,
    },

    /// Sequence 0 or beyond the five-digit field.
    #[error("reference sequence {0} out of range 1..={MAX_SEQUENCE}")]
    SequenceOutOfRange(u32),

    /// The bucket has issued every available sequence.
    #[error("reference bucket {bucket} is exhausted")]
    BucketExhausted {
        /// The full bucket.
        bucket: Bucket,
    },
}

// ─── Kind ────────────────────────────────────────────────────────────

/// Which entity a reference is issued to. Each kind has its own counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// Document request (`REQ`).
    Request,
    /// Complaint (`CMPL`).
    Complaint,
}

impl RefKind {
    /// Code prefix.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Request => "REQ",
            Self::Complaint => "CMPL",
        }
    }

    /// Stable lowercase name, used as the counter key in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Complaint => "complaint",
        }
    }

    /// Look up a kind by its code prefix.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "REQ" => Some(Self::Request),
            "CMPL" => Some(Self::Complaint),
            _ => None,
        }
    }

    /// Both kinds.
    pub const ALL: [RefKind; 2] = [RefKind::Request, RefKind::Complaint];
}

impl FromStr for RefKind {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "request" | "req" => Ok(Self::Request),
            "complaint" | "cmpl" => Ok(Self::Complaint),
            _ => Err(ReferenceError::UnknownPrefix(s.to_string())),
        }
    }
}

impl std::fmt::Display for RefKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Bucket ──────────────────────────────────────────────────────────

/// A (kind, year, month) grouping with an independent sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bucket {
    kind: RefKind,
    year: i32,
    month: u32,
}

impl Bucket {
    /// Construct a bucket, validating the period.
    pub fn new(kind: RefKind, year: i32, month: u32) -> Result<Self, ReferenceError> {
        if !(1000..=9999).contains(&year) || !(1..=12).contains(&month) {
            return Err(ReferenceError::InvalidPeriod { year, month });
        }
        Ok(Self { kind, year, month })
    }

    /// The bucket an allocation at `now` falls into (civic offset month).
    pub fn for_instant(kind: RefKind, now: Timestamp) -> Result<Self, ReferenceError> {
        let (year, month) = now.civic_year_month();
        Self::new(kind, year, month)
    }

    pub fn kind(&self) -> RefKind {
        self.kind
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Shared prefix of every code in this bucket, e.g. `REQ-2025-01-`.
    pub fn code_prefix(&self) -> String {
        format!("{}-{:04}-{:02}-", self.kind.prefix(), self.year, self.month)
    }

    /// The reference with the given sequence in this bucket.
    pub fn reference(&self, sequence: u32) -> Result<Reference, ReferenceError> {
        if sequence > MAX_SEQUENCE {
            return Err(ReferenceError::BucketExhausted { bucket: *self });
        }
        Reference::new(*self, sequence)
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{:04}-{:02}", self.kind, self.year, self.month)
    }
}

// ─── Reference ───────────────────────────────────────────────────────

/// A validated reference code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference {
    bucket: Bucket,
    sequence: u32,
}

impl Reference {
    /// Construct from a bucket and a sequence in `1..=MAX_SEQUENCE`.
    pub fn new(bucket: Bucket, sequence: u32) -> Result<Self, ReferenceError> {
        if sequence == 0 || sequence > MAX_SEQUENCE {
            return Err(ReferenceError::SequenceOutOfRange(sequence));
        }
        Ok(Self { bucket, sequence })
    }

    /// Parse a code such as `REQ-2025-01-00001`.
    ///
    /// Strict: the year must be four digits, the month two, the sequence
    /// exactly five. `REQ-2025-1-1` is rejected.
    pub fn parse(s: &str) -> Result<Self, ReferenceError> {
        let malformed = || ReferenceError::Malformed(s.to_string());
        let mut parts = s.split('-');
        let (Some(prefix), Some(year), Some(month), Some(seq), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(malformed());
        };

        let kind = RefKind::from_prefix(prefix)
            .ok_or_else(|| ReferenceError::UnknownPrefix(prefix.to_string()))?;

        if year.len() != 4 || month.len() != 2 || seq.len() != SEQUENCE_WIDTH {
            return Err(malformed());
        }
        let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(year) || !all_digits(month) || !all_digits(seq) {
            return Err(malformed());
        }

        let year: i32 = year.parse().map_err(|_| malformed())?;
        let month: u32 = month.parse().map_err(|_| malformed())?;
        let sequence: u32 = seq.parse().map_err(|_| malformed())?;

        Self::new(Bucket::new(kind, year, month)?, sequence)
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    pub fn kind(&self) -> RefKind {
        self.bucket.kind
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Render the code.
    pub fn to_code(&self) -> String {
        format!(
            "{}{:0width$}",
            self.bucket.code_prefix(),
            self.sequence,
            width = SEQUENCE_WIDTH
        )
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_code())
    }
}

impl FromStr for Reference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Reference {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_code())
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
