//! # Reference Allocator
//!
//! Issues `REQ-YYYY-MM-NNNNN` / `CMPL-YYYY-MM-NNNNN` codes.
//!
//! The store's per-bucket counter is the only point of mutual exclusion:
//! each call to [`CivicStore::next_sequence`] is a single atomic increment
//! (`INSERT … ON CONFLICT DO UPDATE … RETURNING` on PostgreSQL). The unique
//! constraint on `ref` backs it up at insert time. [`ReferenceAllocator::issue`]
//! wraps allocate-then-insert in a bounded retry:
//!
//! | Failure                          | Action                              |
//! |----------------------------------|-------------------------------------|
//! | `Unavailable` (counter or insert)| back off, retry within budget       |
//! | `UniqueViolation` on insert      | allocate a fresh code, retry        |
//! | budget exhausted on duplicates   | `Conflict` (duplicate reference)    |
//! | budget exhausted on outage       | `StorageUnavailable`                |
//! | sequence above 99999             | `Conflict` (bucket exhausted), no retry |

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use civic_core::{Bucket, CivicError, RefKind, Reference, Timestamp};

use crate::config::DEFAULT_ALLOCATION_MAX_ATTEMPTS;
use crate::store::{CivicStore, StoreError};

/// Bounded retry budget for allocate-and-insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each further failure.
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_ALLOCATION_MAX_ATTEMPTS,
            base_backoff_ms: 25,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Delay after the given failed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.base_backoff_ms.saturating_mul(factor))
    }
}

#[derive(Debug, Clone)]
pub struct ReferenceAllocator {
    store: Arc<dyn CivicStore>,
    policy: RetryPolicy,
}

impl ReferenceAllocator {
    pub fn new(store: Arc<dyn CivicStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Issue the next code in `kind`'s bucket for `now`.
    ///
    /// Transient counter failures are retried within the policy budget.
    pub async fn allocate(&self, kind: RefKind, now: Timestamp) -> Result<Reference, CivicError> {
        let bucket = Bucket::for_instant(kind, now)?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.store.next_sequence(bucket).await {
                Ok(sequence) => return Ok(bucket.reference(sequence)?),
                Err(err) if err.is_transient() && attempt < self.policy.max_attempts => {
                    self.back_off(bucket, attempt, &err).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Allocate a code and hand it to `insert`, retrying with a fresh code
    /// when the insert hits the unique constraint on `ref`.
    pub async fn issue<T, F, Fut>(
        &self,
        kind: RefKind,
        now: Timestamp,
        mut insert: F,
    ) -> Result<T, CivicError>
    where
        F: FnMut(Reference) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let bucket = Bucket::for_instant(kind, now)?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let last = attempt >= self.policy.max_attempts;

            let sequence = match self.store.next_sequence(bucket).await {
                Ok(sequence) => sequence,
                Err(err) if err.is_transient() && !last => {
                    self.back_off(bucket, attempt, &err).await;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let reference = bucket.reference(sequence)?;

            match insert(reference).await {
                Ok(value) => {
                    metrics::counter!("civic_references_allocated_total", "kind" => kind.as_str())
                        .increment(1);
                    tracing::info!(reference = %reference, attempt, "reference issued");
                    return Ok(value);
                }
                Err(StoreError::UniqueViolation(detail)) => {
                    tracing::warn!(
                        reference = %reference,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        "reference already taken: {detail}"
                    );
                    if last {
                        return Err(CivicError::Conflict(format!(
                            "duplicate reference in bucket {bucket} after {attempt} attempts"
                        )));
                    }
                }
                Err(err) if err.is_transient() && !last => {
                    self.back_off(bucket, attempt, &err).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// The code the next call to [`issue`](Self::issue) in `kind`'s bucket
    /// for `at` would receive. Nothing is consumed.
    pub async fn peek(&self, kind: RefKind, at: Timestamp) -> Result<Reference, CivicError> {
        let bucket = Bucket::for_instant(kind, at)?;
        let last = self.store.last_sequence(bucket).await?;
        Ok(bucket.reference(last.saturating_add(1))?)
    }

    async fn back_off(&self, bucket: Bucket, attempt: u32, err: &StoreError) {
        let delay = self.policy.delay_for_attempt(attempt);
        tracing::warn!(
            bucket = %bucket,
            attempt,
            max_attempts = self.policy.max_attempts,
            "reference allocation failed, retrying in {delay:?}: {err}"
        );
        tokio::time::sleep(delay).await;
    }
}
