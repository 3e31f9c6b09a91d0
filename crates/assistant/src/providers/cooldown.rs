//! Per-provider circuit breaker.
//!
//! A provider is **Open** (must not be called) while `now < cooldown_until`
//! and **Closed** otherwise. Quota errors open the circuit for the
//! provider's retry hint, or the configured default. A successful health
//! probe closes it early. The same record carries `last_health_check_at`,
//! which throttles probing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::store::{KeyValueStore, StoreError};

use super::ProviderId;

const CAS_ATTEMPTS: usize = 16;

/// Stored circuit state for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderState {
    pub provider: ProviderId,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub last_health_check_at: Option<DateTime<Utc>>,
}

impl ProviderState {
    /// A closed circuit that has never been probed.
    #[must_use]
    pub const fn closed(provider: ProviderId) -> Self {
        Self {
            provider,
            cooldown_until: None,
            last_health_check_at: None,
        }
    }

    #[must_use]
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    /// Cooldown left at `now`, zero when closed.
    #[must_use]
    pub fn remaining_at(&self, now: DateTime<Utc>) -> TimeDelta {
        self.cooldown_until
            .map_or(TimeDelta::zero(), |until| (until - now).max(TimeDelta::zero()))
    }
}

/// Public view of a provider's circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub provider: ProviderId,
    pub open: bool,
    pub remaining_cooldown_ms: i64,
}

/// Circuit breaker for every provider, keyed by [`ProviderId`].
#[derive(Clone)]
pub struct CooldownTracker {
    store: Arc<dyn KeyValueStore<ProviderState>>,
    default_cooldown: TimeDelta,
    health_interval: TimeDelta,
}

impl CooldownTracker {
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyValueStore<ProviderState>>,
        default_cooldown: TimeDelta,
        health_interval: TimeDelta,
    ) -> Self {
        Self {
            store,
            default_cooldown,
            health_interval,
        }
    }

    fn key(provider: ProviderId) -> String {
        format!("provider:{provider}")
    }

    /// Current state. Store errors read as a closed circuit.
    pub async fn state(&self, provider: ProviderId) -> ProviderState {
        match self.store.get(&Self::key(provider)).await {
            Ok(state) => state.unwrap_or_else(|| ProviderState::closed(provider)),
            Err(e) => {
                warn!(error = %e, %provider, "Cooldown store read failed, treating provider as closed");
                ProviderState::closed(provider)
            }
        }
    }

    pub async fn is_open(&self, provider: ProviderId) -> bool {
        self.is_open_at(provider, Utc::now()).await
    }

    /// Whether `provider` must not be called at `now`. No side effects.
    pub async fn is_open_at(&self, provider: ProviderId, now: DateTime<Utc>) -> bool {
        self.state(provider).await.is_open_at(now)
    }

    pub async fn remaining(&self, provider: ProviderId) -> TimeDelta {
        self.remaining_at(provider, Utc::now()).await
    }

    /// Cooldown left for `provider` at `now`. No side effects.
    pub async fn remaining_at(&self, provider: ProviderId, now: DateTime<Utc>) -> TimeDelta {
        self.state(provider).await.remaining_at(now)
    }

    /// Open the circuit after a quota error.
    ///
    /// Uses `retry_hint` when the provider supplied one, otherwise the
    /// configured default. Returns when the cooldown ends.
    pub async fn open(
        &self,
        provider: ProviderId,
        retry_hint: Option<Duration>,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let cooldown = retry_hint
            .and_then(|hint| TimeDelta::from_std(hint).ok())
            .unwrap_or(self.default_cooldown);
        let until = now + cooldown;

        let result = self
            .update(provider, now, |state| {
                Some(ProviderState {
                    cooldown_until: Some(until),
                    ..state.clone()
                })
            })
            .await;

        match result {
            Ok(_) => warn!(%provider, cooldown_ms = cooldown.num_milliseconds(), "Provider circuit opened"),
            Err(e) => warn!(error = %e, %provider, "Failed to record provider cooldown"),
        }
        until
    }

    /// Close the circuit (after a successful probe).
    pub async fn close(&self, provider: ProviderId, now: DateTime<Utc>) {
        let result = self
            .update(provider, now, |state| {
                Some(ProviderState {
                    cooldown_until: None,
                    ..state.clone()
                })
            })
            .await;

        match result {
            Ok(_) => info!(%provider, "Provider circuit closed"),
            Err(e) => warn!(error = %e, %provider, "Failed to close provider circuit"),
        }
    }

    /// Claim the probe slot for an open provider.
    ///
    /// Succeeds at most once per health interval across concurrent callers:
    /// the winner's compare-and-swap stamps `last_health_check_at`, and every
    /// other caller then sees a fresh timestamp. Closed providers are never
    /// claimed.
    pub async fn claim_probe(&self, provider: ProviderId, now: DateTime<Utc>) -> bool {
        let interval = self.health_interval;
        let result = self
            .update(provider, now, |state| {
                let throttled = state
                    .last_health_check_at
                    .is_some_and(|last| now - last < interval);
                if !state.is_open_at(now) || throttled {
                    return None;
                }
                Some(ProviderState {
                    last_health_check_at: Some(now),
                    ..state.clone()
                })
            })
            .await;

        match result {
            Ok(claimed) => claimed.is_some(),
            Err(e) => {
                warn!(error = %e, %provider, "Failed to claim health probe");
                false
            }
        }
    }

    /// Circuit status for every provider.
    pub async fn status(&self) -> Vec<ProviderStatus> {
        let now = Utc::now();
        let mut statuses = Vec::with_capacity(ProviderId::ALL.len());
        for provider in ProviderId::ALL {
            let state = self.state(provider).await;
            statuses.push(ProviderStatus {
                provider,
                open: state.is_open_at(now),
                remaining_cooldown_ms: state.remaining_at(now).num_milliseconds(),
            });
        }
        statuses
    }

    /// Drop provider records nobody needs any more.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn sweep(&self) -> Result<usize, StoreError> {
        self.store.sweep_expired().await
    }

    /// Apply `change` to the provider's record with compare-and-swap.
    ///
    /// `change` returns `None` to leave the record untouched. Returns the
    /// written state, if any.
    async fn update<F>(
        &self,
        provider: ProviderId,
        now: DateTime<Utc>,
        change: F,
    ) -> Result<Option<ProviderState>, StoreError>
    where
        F: Fn(&ProviderState) -> Option<ProviderState> + Send + Sync,
    {
        let key = Self::key(provider);

        for _ in 0..CAS_ATTEMPTS {
            let current = self.store.get(&key).await?;
            let base = current
                .clone()
                .unwrap_or_else(|| ProviderState::closed(provider));

            let Some(next) = change(&base) else {
                return Ok(None);
            };

            let ttl = self.retention(&next, now);
            if self
                .store
                .compare_and_swap(&key, current.as_ref(), next.clone(), Some(ttl))
                .await?
            {
                return Ok(Some(next));
            }
        }

        Err(StoreError::Contention(key))
    }

    /// How long a record stays relevant: until its cooldown ends and the
    /// probe throttle has lapsed.
    fn retention(&self, state: &ProviderState, now: DateTime<Utc>) -> TimeDelta {
        state.remaining_at(now) + self.health_interval
    }
}
