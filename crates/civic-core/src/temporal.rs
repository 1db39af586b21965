//! # Temporal Types — UTC at Rest, Civic Offset at the Edge
//!
//! Defines `Timestamp`, a UTC-only instant truncated to seconds precision.
//! Persisted values are always UTC. The fixed UTC+8 civic offset is applied
//! in exactly two places:
//!
//! - [`Timestamp::civic_display`], when an entity is serialized for clients.
//! - [`Timestamp::civic_year_month`], when choosing a reference bucket.
//!
//! Applying the offset anywhere else (for example before persisting) would
//! shift stored instants by eight hours on every round trip.

use chrono::{DateTime, Datelike, NaiveDateTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CivicError;

/// Hours east of UTC for the civic display offset.
pub const CIVIC_OFFSET_HOURS: i64 = 8;

/// The civic offset as a duration.
pub fn civic_offset() -> TimeDelta {
    TimeDelta::hours(CIVIC_OFFSET_HOURS)
}

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 string with a `Z` suffix.
    ///
    /// Explicit offsets (even `+00:00`) are rejected so that stored and
    /// client-supplied instants share one spelling.
    pub fn parse(s: &str) -> Result<Self, CivicError> {
        if !s.ends_with('Z') {
            return Err(CivicError::Validation(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        Self::parse_lenient(s)
    }

    /// Parse an RFC 3339 string with any offset, converting to UTC.
    pub fn parse_lenient(s: &str) -> Result<Self, CivicError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            CivicError::Validation(format!("invalid RFC 3339 timestamp {s:?}: {e}"))
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render as ISO 8601 with Z suffix (e.g. `2025-01-15T10:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    /// The wall-clock time at the civic offset.
    pub fn civic_local(&self) -> NaiveDateTime {
        self.0.naive_utc() + civic_offset()
    }

    /// Render at the civic offset (e.g. `2025-01-15T18:00:00+08:00`).
    ///
    /// Presentation only. The stored instant is unchanged.
    pub fn civic_display(&self) -> String {
        format!(
            "{}+{:02}:00",
            self.civic_local().format("%Y-%m-%dT%H:%M:%S"),
            CIVIC_OFFSET_HOURS
        )
    }

    /// Calendar year and month at the civic offset.
    pub fn civic_year_month(&self) -> (i32, u32) {
        let local = self.civic_local();
        (local.year(), local.month())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_utc(dt)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
