//! Completion providers and the failover machinery around them.
//!
//! # Architecture
//!
//! - [`CompletionProvider`] is the seam to an external text-completion API
//!   (`claude` for provider A, `openai` for provider B)
//! - [`cooldown::CooldownTracker`] is the per-provider circuit breaker
//! - [`failover::FailoverOrchestrator`] sequences primary, fallback, and the
//!   localized degraded reply from [`templates`]
//! - [`health::HealthScheduler`] probes open providers after the response has
//!   been sent and closes their circuit early on success

pub mod claude;
pub mod cooldown;
pub mod failover;
pub mod health;
pub mod openai;
pub mod prompt;
pub mod templates;

use core::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vitaguide_core::{ConversationTurn, Language, ProductCandidate, UserId};

pub use claude::ClaudeProvider;
pub use cooldown::{CooldownTracker, ProviderState, ProviderStatus};
pub use failover::{FailoverOrchestrator, FailoverOutcome, ReplySource};
pub use health::{HealthCheckJob, HealthScheduler, ProbeOutcome};
pub use openai::OpenAiProvider;

/// Which configured completion provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderId {
    A,
    B,
}

impl ProviderId {
    pub const ALL: [Self; 2] = [Self::A, Self::B];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }

    /// The provider used as fallback when this one is primary.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from a completion provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider signalled a quota or rate limit.
    #[error("provider {provider} quota exceeded")]
    Quota {
        provider: ProviderId,
        /// Provider-supplied hint for when to retry.
        retry_after: Option<Duration>,
    },

    /// Any other failure (network, auth, malformed response).
    #[error("provider {provider} failed: {message}")]
    Failure {
        provider: ProviderId,
        message: String,
    },

    /// The provider answered with nothing usable.
    #[error("provider {0} returned an empty reply")]
    EmptyReply(ProviderId),
}

impl ProviderError {
    /// Whether this error should open the provider's circuit.
    #[must_use]
    pub const fn is_quota(&self) -> bool {
        matches!(self, Self::Quota { .. })
    }
}

/// Everything a provider needs to answer one chat turn.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub message: &'a str,
    pub user_id: Option<&'a UserId>,
    /// Rendered profile summary for the system prompt.
    pub profile_context: &'a str,
    pub history: &'a [ConversationTurn],
    pub language: Language,
}

/// A provider's answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub reply: String,
    /// Products the provider attached to its answer, if any.
    pub products: Vec<ProductCandidate>,
}

/// An external text-completion API.
///
/// Cooldown state is not the provider's concern; the
/// [`CooldownTracker`] answers "is this provider open" by id.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Produce a reply for one chat turn.
    async fn generate(&self, request: &CompletionRequest<'_>) -> Result<Completion, ProviderError>;

    /// Cheap liveness probe. Must not panic or return errors; failures are `false`.
    async fn probe_health(&self) -> bool;
}

/// Parse a `Retry-After` header given in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    use super::*;

    #[test]
    fn test_provider_other() {
        assert_eq!(ProviderId::A.other(), ProviderId::B);
        assert_eq!(ProviderId::B.other(), ProviderId::A);
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(30)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("1.5"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_millis(1500)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_quota_error_display() {
        let err = ProviderError::Quota {
            provider: ProviderId::B,
            retry_after: None,
        };
        assert!(err.is_quota());
        assert_eq!(err.to_string(), "provider B quota exceeded");
    }
}
