//! Background probing of open providers.
//!
//! The failover stage never probes inline. It hands the HTTP layer a
//! [`HealthCheckJob`], which is spawned only once the response has been
//! built, so probe latency and failures never reach the caller.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::analytics::AnalyticsSink;

use super::{CompletionProvider, CooldownTracker, ProviderId};

/// What happened to one provider during a health pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Circuit was closed; nothing to probe.
    NotOpen,
    /// Probed too recently (or another caller holds the slot).
    Throttled,
    /// Probe succeeded and the circuit was closed.
    Recovered,
    /// Probe failed; only the probe timestamp moved.
    StillFailing,
}

/// Probes open providers and closes their circuit on success.
#[derive(Clone)]
pub struct HealthScheduler {
    tracker: CooldownTracker,
    providers: Arc<[Arc<dyn CompletionProvider>]>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl HealthScheduler {
    #[must_use]
    pub fn new(
        tracker: CooldownTracker,
        providers: Vec<Arc<dyn CompletionProvider>>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            tracker,
            providers: providers.into(),
            analytics,
        }
    }

    /// A deferred health pass, to be started after the response is out.
    #[must_use]
    pub fn job(&self) -> HealthCheckJob {
        HealthCheckJob {
            scheduler: self.clone(),
        }
    }

    /// Probe every open provider whose throttle has lapsed, concurrently.
    #[instrument(skip(self))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Vec<(ProviderId, ProbeOutcome)> {
        let probes = self
            .providers
            .iter()
            .map(|provider| self.probe_one(Arc::clone(provider), now));
        join_all(probes).await
    }

    async fn probe_one(
        &self,
        provider: Arc<dyn CompletionProvider>,
        now: DateTime<Utc>,
    ) -> (ProviderId, ProbeOutcome) {
        let id = provider.id();

        if !self.tracker.is_open_at(id, now).await {
            return (id, ProbeOutcome::NotOpen);
        }
        if !self.tracker.claim_probe(id, now).await {
            debug!(provider = %id, "Health probe throttled");
            return (id, ProbeOutcome::Throttled);
        }

        if !provider.probe_health().await {
            debug!(provider = %id, "Provider still unhealthy");
            return (id, ProbeOutcome::StillFailing);
        }

        self.tracker.close(id, now).await;
        info!(provider = %id, "Provider recovered after health probe");

        let properties = json!({ "provider": id.as_str(), "recoveredAt": now.to_rfc3339() });
        if let Err(e) = self.analytics.record("provider_recovered", properties).await {
            warn!(error = %e, "Failed to record provider recovery");
        }

        (id, ProbeOutcome::Recovered)
    }
}

/// A health pass waiting to be started.
#[must_use = "a health check job does nothing until run or spawned"]
pub struct HealthCheckJob {
    scheduler: HealthScheduler,
}

impl HealthCheckJob {
    /// Run the pass now.
    pub async fn run(self) -> Vec<(ProviderId, ProbeOutcome)> {
        self.scheduler.run_at(Utc::now()).await
    }

    /// Run the pass in the background.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let outcomes = self.run().await;
            debug!(?outcomes, "Health pass finished");
        })
    }
}
