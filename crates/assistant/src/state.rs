//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::analytics::{AnalyticsError, AnalyticsSink, KlaviyoSink, TracingSink};
use crate::catalog::{ScoringWeights, ShopifyCatalog, WeightsError};
use crate::config::AssistantConfig;
use crate::db::{self, PgProfileStore};
use crate::language::KeywordLanguageDetector;
use crate::profiles::{MemoryProfileStore, ProfileStore};
use crate::providers::{
    ClaudeProvider, CompletionProvider, CooldownTracker, OpenAiProvider, ProviderError,
};
use crate::rate_limit::RateLimiter;
use crate::services::{Assistant, Collaborators};
use crate::store::MemoryStore;

/// How often expired rate-limit and cooldown records are dropped.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("provider setup failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("analytics setup failed: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("scoring weights: {0}")]
    Weights(#[from] WeightsError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    assistant: Assistant,
    rate_limiter: RateLimiter,
    pool: Option<PgPool>,
}

impl AppState {
    #[must_use]
    pub fn new(assistant: Assistant, rate_limiter: RateLimiter, pool: Option<PgPool>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                assistant,
                rate_limiter,
                pool,
            }),
        }
    }

    /// Build the production pipeline from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable, a provider or
    /// analytics client cannot be built, or the weights file is invalid.
    pub async fn from_config(config: &AssistantConfig) -> Result<Self, StateError> {
        let pool = match &config.database_url {
            Some(url) => Some(db::create_pool(url).await?),
            None => None,
        };
        let profiles: Arc<dyn ProfileStore> = if let Some(pool) = &pool {
            Arc::new(PgProfileStore::new(pool.clone()))
        } else {
            warn!("No database configured, profiles are kept in memory");
            Arc::new(MemoryProfileStore::new())
        };

        let mut providers: Vec<Arc<dyn CompletionProvider>> = Vec::new();
        if let Some(claude) = &config.claude {
            providers.push(Arc::new(ClaudeProvider::new(claude)?));
        }
        if let Some(openai) = &config.openai {
            providers.push(Arc::new(OpenAiProvider::new(openai)?));
        }
        if providers.is_empty() {
            warn!("No completion provider configured, every reply will be a template");
        }

        let analytics: Arc<dyn AnalyticsSink> = match &config.klaviyo {
            Some(klaviyo) => Arc::new(KlaviyoSink::new(klaviyo)?),
            None => Arc::new(TracingSink),
        };

        let weights = match &config.scoring_weights_file {
            Some(path) => {
                info!(path = %path.display(), "Loading scoring weights");
                ScoringWeights::from_yaml_file(path)?
            }
            None => ScoringWeights::default(),
        };

        let limits = config.limits;
        let tracker = CooldownTracker::new(
            Arc::new(MemoryStore::new()),
            limits.provider_cooldown,
            limits.health_check_interval,
        );
        let rate_limiter = RateLimiter::new(
            Arc::new(MemoryStore::new()),
            limits.rate_limit_max_requests,
            limits.rate_limit_window,
        );

        let assistant = Assistant::new(
            Collaborators {
                providers,
                catalog: Arc::new(ShopifyCatalog::new(&config.shopify)),
                profiles,
                language: Arc::new(KeywordLanguageDetector::new(config.default_language)),
                analytics,
            },
            tracker,
            weights,
        );

        Ok(Self::new(assistant, rate_limiter, pool))
    }

    #[must_use]
    pub fn assistant(&self) -> &Assistant {
        &self.inner.assistant
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.rate_limiter
    }

    /// Profile database pool, when one is configured.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// Drop expired rate-limit and cooldown records every minute.
    pub fn start_store_sweeper(&self) -> JoinHandle<()> {
        let rate_limiter = self.inner.rate_limiter.clone();
        let tracker = self.inner.assistant.tracker().clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                match rate_limiter.sweep().await {
                    Ok(removed) => debug!(removed, "Swept rate-limit records"),
                    Err(e) => warn!(error = %e, "Rate-limit sweep failed"),
                }
                match tracker.sweep().await {
                    Ok(removed) => debug!(removed, "Swept provider states"),
                    Err(e) => warn!(error = %e, "Provider state sweep failed"),
                }
            }
        })
    }
}
