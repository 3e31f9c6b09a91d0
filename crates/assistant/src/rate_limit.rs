//! Per-identifier fixed-window rate limiting.
//!
//! Each identifier (user id, else client IP) gets one record holding the
//! number of accepted calls and when the current window resets. The first
//! call after `reset_at` starts a fresh window counted as 1. Calls past the
//! maximum are rejected until the window resets.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{instrument, warn};

use crate::store::{KeyValueStore, StoreError};

/// Default number of accepted calls per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 30;

/// Default window length in seconds.
pub const DEFAULT_WINDOW_SECS: i64 = 60;

/// Attempts at winning the compare-and-swap before giving up on a check.
const CAS_ATTEMPTS: usize = 16;

/// Retry hint for a call rejected because the record stayed contended.
const CONTENTION_RETRY_SECS: i64 = 1;

/// The stored window for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub window_reset_at: DateTime<Utc>,
}

/// Result of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Time until the window resets, never negative.
    #[must_use]
    pub fn retry_after(&self, now: DateTime<Utc>) -> TimeDelta {
        (self.reset_at - now).max(TimeDelta::zero())
    }

    /// [`Self::retry_after`] in whole seconds, rounded up.
    #[must_use]
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = self.retry_after(now).num_milliseconds();
        u64::try_from(millis).map_or(0, |ms| ms.div_ceil(1000))
    }
}

/// Fixed-window limiter over a shared [`KeyValueStore`].
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore<RateLimitRecord>>,
    max_requests: u32,
    window: TimeDelta,
}

impl RateLimiter {
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyValueStore<RateLimitRecord>>,
        max_requests: u32,
        window: TimeDelta,
    ) -> Self {
        Self {
            store,
            max_requests,
            window,
        }
    }

    /// Configured maximum per window.
    #[must_use]
    pub const fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Count a call for `identifier` against the current window.
    pub async fn check(&self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, Utc::now()).await
    }

    /// [`Self::check`] at an explicit instant.
    ///
    /// An unreachable store allows the call. A record that stays contended
    /// past every compare-and-swap attempt rejects it, so a burst can never
    /// push the count past the maximum.
    #[instrument(skip(self))]
    pub async fn check_at(&self, identifier: &str, now: DateTime<Utc>) -> RateLimitDecision {
        match self.try_check(identifier, now).await {
            Ok(decision) => decision,
            Err(e @ StoreError::Contention(_)) => {
                warn!(error = %e, "Rate limit record contended, rejecting request");
                RateLimitDecision {
                    allowed: false,
                    limit: self.max_requests,
                    remaining: 0,
                    reset_at: now + TimeDelta::seconds(CONTENTION_RETRY_SECS),
                }
            }
            Err(e @ StoreError::Unavailable(_)) => {
                warn!(error = %e, "Rate limit store failed, allowing request");
                RateLimitDecision {
                    allowed: true,
                    limit: self.max_requests,
                    remaining: self.max_requests,
                    reset_at: now + self.window,
                }
            }
        }
    }

    /// Drop records whose window has expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn sweep(&self) -> Result<usize, StoreError> {
        self.store.sweep_expired().await
    }

    async fn try_check(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, StoreError> {
        let key = format!("ratelimit:{identifier}");

        for _ in 0..CAS_ATTEMPTS {
            let current = self.store.get(&key).await?;

            let next = match &current {
                Some(record) if now < record.window_reset_at => {
                    if record.count >= self.max_requests {
                        return Ok(self.decision(false, record));
                    }
                    RateLimitRecord {
                        count: record.count + 1,
                        window_reset_at: record.window_reset_at,
                    }
                }
                // First call, or the previous window has passed.
                _ => RateLimitRecord {
                    count: 1,
                    window_reset_at: now + self.window,
                },
            };

            let ttl = (next.window_reset_at - now).max(TimeDelta::zero());
            if self
                .store
                .compare_and_swap(&key, current.as_ref(), next.clone(), Some(ttl))
                .await?
            {
                return Ok(self.decision(true, &next));
            }
        }

        Err(StoreError::Contention(key))
    }

    fn decision(&self, allowed: bool, record: &RateLimitRecord) -> RateLimitDecision {
        RateLimitDecision {
            allowed,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(record.count),
            reset_at: record.window_reset_at,
        }
    }
}
