//! Primary, fallback, then degraded reply.
//!
//! ```text
//! TryPrimary --ok--> Done
//!     | quota error (opens circuit) / other failure / circuit open
//!     v
//! TryFallback --ok--> Done
//!     | any failure
//!     v
//! Degraded(template)
//! ```
//!
//! The cooldown tracker is consulted before every external call. When both
//! circuits are open at the start, no call is made at all. The degraded path
//! cannot fail.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::{info, instrument, warn};
use vitaguide_core::ProductCandidate;

use super::templates::degraded_reply;
use super::{CompletionProvider, CompletionRequest, CooldownTracker, ProviderError, ProviderId};

/// Which source produced the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Provider(ProviderId),
    Template,
}

impl ReplySource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Provider(id) => id.as_str(),
            Self::Template => "template",
        }
    }
}

impl Serialize for ReplySource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Result of one pass through the failover state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverOutcome {
    pub reply: String,
    pub products: Vec<ProductCandidate>,
    pub source: ReplySource,
    /// Providers actually called, in order.
    pub attempted: Vec<ProviderId>,
    /// Whether a background health pass should follow the response.
    pub schedule_health_check: bool,
}

/// Sequences the configured providers for one request.
#[derive(Clone)]
pub struct FailoverOrchestrator {
    providers: Arc<HashMap<ProviderId, Arc<dyn CompletionProvider>>>,
    tracker: CooldownTracker,
}

impl FailoverOrchestrator {
    /// Providers are keyed by their own [`CompletionProvider::id`]. A missing
    /// provider is treated as unavailable.
    #[must_use]
    pub fn new(providers: &[Arc<dyn CompletionProvider>], tracker: CooldownTracker) -> Self {
        let providers = providers
            .iter()
            .map(|provider| (provider.id(), Arc::clone(provider)))
            .collect();
        Self {
            providers: Arc::new(providers),
            tracker,
        }
    }

    /// The cooldown tracker consulted before each call.
    #[must_use]
    pub const fn tracker(&self) -> &CooldownTracker {
        &self.tracker
    }

    pub async fn complete(
        &self,
        primary: ProviderId,
        request: &CompletionRequest<'_>,
    ) -> FailoverOutcome {
        self.complete_at(primary, request, Utc::now()).await
    }

    /// Run the state machine with an explicit clock.
    #[instrument(skip(self, request), fields(primary = %primary))]
    pub async fn complete_at(
        &self,
        primary: ProviderId,
        request: &CompletionRequest<'_>,
        now: DateTime<Utc>,
    ) -> FailoverOutcome {
        let order = [primary, primary.other()];
        let mut attempted = Vec::with_capacity(order.len());
        let mut schedule_health_check = false;

        for id in order {
            let Some(provider) = self.providers.get(&id) else {
                continue;
            };
            if self.tracker.is_open_at(id, now).await {
                info!(provider = %id, "Provider circuit open, skipping");
                schedule_health_check = true;
                continue;
            }

            attempted.push(id);
            match provider.generate(request).await {
                Ok(completion) if !completion.reply.trim().is_empty() => {
                    return FailoverOutcome {
                        reply: completion.reply,
                        products: completion.products,
                        source: ReplySource::Provider(id),
                        attempted,
                        schedule_health_check,
                    };
                }
                Ok(_) => warn!(provider = %id, "Provider returned an empty reply"),
                Err(ProviderError::Quota { retry_after, .. }) => {
                    self.tracker.open(id, retry_after, now).await;
                    schedule_health_check = true;
                }
                Err(e) => warn!(provider = %id, error = %e, "Provider failed"),
            }
        }

        warn!(?attempted, "All providers unavailable, using degraded reply");
        FailoverOutcome {
            reply: degraded_reply(request.message, request.language),
            products: Vec::new(),
            source: ReplySource::Template,
            attempted,
            schedule_health_check,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::TimeDelta;
    use vitaguide_core::Language;

    use super::*;
    use crate::providers::Completion;
    use crate::store::MemoryStore;

    /// Replays scripted results and counts calls.
    struct Scripted {
        id: ProviderId,
        results: Mutex<Vec<Result<String, ProviderError>>>,
        calls: Mutex<usize>,
    }

    impl Scripted {
        fn new(id: ProviderId, results: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                id,
                results: Mutex::new(results),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().expect("lock")
        }
    }

    #[async_trait]
    impl CompletionProvider for Scripted {
        fn id(&self) -> ProviderId {
            self.id
        }

        async fn generate(
            &self,
            _request: &CompletionRequest<'_>,
        ) -> Result<Completion, ProviderError> {
            *self.calls.lock().expect("lock") += 1;
            let next = {
                let mut results = self.results.lock().expect("lock");
                if results.is_empty() {
                    Ok("default reply".to_string())
                } else {
                    results.remove(0)
                }
            };
            next.map(|reply| Completion {
                reply,
                products: Vec::new(),
            })
        }

        async fn probe_health(&self) -> bool {
            false
        }
    }

    fn quota(id: ProviderId, secs: u64) -> ProviderError {
        ProviderError::Quota {
            provider: id,
            retry_after: Some(Duration::from_secs(secs)),
        }
    }

    fn tracker() -> CooldownTracker {
        CooldownTracker::new(
            Arc::new(MemoryStore::new()),
            TimeDelta::seconds(60),
            TimeDelta::minutes(10),
        )
    }

    fn request(message: &str) -> CompletionRequest<'_> {
        CompletionRequest {
            message,
            user_id: None,
            profile_context: "",
            history: &[],
            language: Language::En,
        }
    }

    fn orchestrator(a: &Arc<Scripted>, b: &Arc<Scripted>, tracker: CooldownTracker) -> FailoverOrchestrator {
        FailoverOrchestrator::new(
            &[a.clone() as Arc<dyn CompletionProvider>, b.clone()],
            tracker,
        )
    }

    #[tokio::test]
    async fn test_primary_success() {
        let a = Scripted::new(ProviderId::A, vec![Ok("from A".to_string())]);
        let b = Scripted::new(ProviderId::B, vec![]);
        let failover = orchestrator(&a, &b, tracker());

        let outcome = failover.complete(ProviderId::A, &request("hi")).await;

        assert_eq!(outcome.reply, "from A");
        assert_eq!(outcome.source, ReplySource::Provider(ProviderId::A));
        assert_eq!(outcome.attempted, vec![ProviderId::A]);
        assert!(!outcome.schedule_health_check);
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_quota_error_opens_circuit_and_falls_back() {
        let tracker = tracker();
        let a = Scripted::new(ProviderId::A, vec![Err(quota(ProviderId::A, 120))]);
        let b = Scripted::new(ProviderId::B, vec![Ok("from B".to_string())]);
        let failover = orchestrator(&a, &b, tracker.clone());
        let now = Utc::now();

        let outcome = failover.complete_at(ProviderId::A, &request("hi"), now).await;

        assert_eq!(outcome.source, ReplySource::Provider(ProviderId::B));
        assert_eq!(outcome.attempted, vec![ProviderId::A, ProviderId::B]);
        assert!(outcome.schedule_health_check);
        assert!(tracker.is_open_at(ProviderId::A, now + TimeDelta::seconds(119)).await);
        assert!(!tracker.is_open_at(ProviderId::A, now + TimeDelta::seconds(120)).await);
    }

    #[tokio::test]
    async fn test_non_quota_failure_falls_back_without_opening() {
        let tracker = tracker();
        let a = Scripted::new(
            ProviderId::A,
            vec![Err(ProviderError::Failure {
                provider: ProviderId::A,
                message: "boom".to_string(),
            })],
        );
        let b = Scripted::new(ProviderId::B, vec![Ok("from B".to_string())]);
        let failover = orchestrator(&a, &b, tracker.clone());

        let outcome = failover.complete(ProviderId::A, &request("hi")).await;

        assert_eq!(outcome.source, ReplySource::Provider(ProviderId::B));
        assert!(!outcome.schedule_health_check);
        assert!(!tracker.is_open(ProviderId::A).await);
    }

    #[tokio::test]
    async fn test_both_open_skips_every_call() {
        let tracker = tracker();
        let now = Utc::now();
        tracker.open(ProviderId::A, None, now).await;
        tracker.open(ProviderId::B, None, now).await;
        let a = Scripted::new(ProviderId::A, vec![]);
        let b = Scripted::new(ProviderId::B, vec![]);
        let failover = orchestrator(&a, &b, tracker);

        let outcome = failover
            .complete_at(ProviderId::A, &request("Can I take iron with coffee together?"), now)
            .await;

        assert_eq!(a.calls() + b.calls(), 0);
        assert!(outcome.attempted.is_empty());
        assert_eq!(outcome.source, ReplySource::Template);
        assert!(outcome.reply.contains("doctor or pharmacist"));
    }

    #[tokio::test]
    async fn test_both_failing_degrades() {
        let tracker = tracker();
        let a = Scripted::new(ProviderId::A, vec![Err(quota(ProviderId::A, 30))]);
        let b = Scripted::new(ProviderId::B, vec![Ok("   ".to_string())]);
        let failover = orchestrator(&a, &b, tracker);

        let outcome = failover.complete(ProviderId::A, &request("hello")).await;

        assert_eq!(outcome.source, ReplySource::Template);
        assert_eq!(outcome.attempted, vec![ProviderId::A, ProviderId::B]);
        assert!(!outcome.reply.trim().is_empty());
    }

    #[tokio::test]
    async fn test_caller_can_choose_primary() {
        let a = Scripted::new(ProviderId::A, vec![]);
        let b = Scripted::new(ProviderId::B, vec![Ok("from B".to_string())]);
        let failover = orchestrator(&a, &b, tracker());

        let outcome = failover.complete(ProviderId::B, &request("hi")).await;
        assert_eq!(outcome.source, ReplySource::Provider(ProviderId::B));
        assert_eq!(a.calls(), 0);
    }

    #[tokio::test]
    async fn test_open_primary_goes_straight_to_fallback() {
        let tracker = tracker();
        let now = Utc::now();
        tracker.open(ProviderId::A, None, now).await;
        let a = Scripted::new(ProviderId::A, vec![]);
        let b = Scripted::new(ProviderId::B, vec![Ok("from B".to_string())]);
        let failover = orchestrator(&a, &b, tracker);

        let outcome = failover.complete_at(ProviderId::A, &request("hi"), now).await;
        assert_eq!(a.calls(), 0);
        assert_eq!(outcome.attempted, vec![ProviderId::B]);
        assert!(outcome.schedule_health_check);
    }

    #[test]
    fn test_reply_source_serializes_as_label() {
        let json = serde_json::to_string(&ReplySource::Template).expect("serialize");
        assert_eq!(json, "\"template\"");
        let json = serde_json::to_string(&ReplySource::Provider(ProviderId::B)).expect("serialize");
        assert_eq!(json, "\"B\"");
    }
}
