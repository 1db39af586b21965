//! # Dashboard & Activity Analytics
//!
//! Staff-facing counts derived from the store's aggregate queries:
//!
//! - [`DashboardStats`]: totals and per-status counts over all records.
//! - The weekly breakdowns: records created in the last
//!   [`WINDOW_DAYS`] days, per civic-local day, grouped by document type
//!   (requests) or current status (complaints).

use chrono::Duration;
use serde::Serialize;

use civic_core::Timestamp;
use civic_state::{ComplaintStatus, RequestStatus};

use crate::store::StatusCount;

/// Length of the activity window, in days.
pub const WINDOW_DAYS: i64 = 7;

/// Start of the activity window ending at `now`.
pub fn window_start(now: Timestamp) -> Timestamp {
    Timestamp::from_utc(*now.as_datetime() - Duration::days(WINDOW_DAYS))
}

/// Headline counts for the staff dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_requests: u64,
    pub total_complaints: u64,
    pub pending_requests: u64,
    pub approved_requests: u64,
    pub rejected_requests: u64,
    pub resolved_complaints: u64,
}

impl DashboardStats {
    pub fn from_counts(
        requests: &[StatusCount<RequestStatus>],
        complaints: &[StatusCount<ComplaintStatus>],
    ) -> Self {
        let requests_in = |status: RequestStatus| -> u64 {
            requests
                .iter()
                .filter(|c| c.status == status)
                .map(|c| c.count)
                .sum()
        };
        Self {
            total_requests: requests.iter().map(|c| c.count).sum(),
            total_complaints: complaints.iter().map(|c| c.count).sum(),
            pending_requests: requests_in(RequestStatus::Pending),
            approved_requests: requests_in(RequestStatus::Approved),
            rejected_requests: requests_in(RequestStatus::Rejected),
            resolved_complaints: complaints
                .iter()
                .filter(|c| c.status == ComplaintStatus::Resolved)
                .map(|c| c.count)
                .sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_sum_status_counts() {
        let stats = DashboardStats::from_counts(
            &[
                StatusCount {
                    status: RequestStatus::Pending,
                    count: 4,
                },
                StatusCount {
                    status: RequestStatus::Rejected,
                    count: 1,
                },
            ],
            &[
                StatusCount {
                    status: ComplaintStatus::InProgress,
                    count: 2,
                },
                StatusCount {
                    status: ComplaintStatus::Resolved,
                    count: 3,
                },
            ],
        );
        assert_eq!(
            stats,
            DashboardStats {
                total_requests: 5,
                total_complaints: 5,
                pending_requests: 4,
                approved_requests: 0,
                rejected_requests: 1,
                resolved_complaints: 3,
            }
        );
    }

    #[test]
    fn empty_store_is_all_zero() {
        assert_eq!(
            DashboardStats::from_counts(&[], &[]),
            DashboardStats::default()
        );
    }

    #[test]
    fn stats_use_camel_case_keys() {
        let json = serde_json::to_value(DashboardStats::default()).unwrap();
        for key in [
            "totalRequests",
            "totalComplaints",
            "pendingRequests",
            "approvedRequests",
            "rejectedRequests",
            "resolvedComplaints",
        ] {
            assert_eq!(json[key], 0, "{key}");
        }
    }

    #[test]
    fn window_spans_seven_days() {
        let now = Timestamp::parse("2025-01-15T10:00:00Z").unwrap();
        assert_eq!(
            window_start(now),
            Timestamp::parse("2025-01-08T10:00:00Z").unwrap()
        );
    }
}
