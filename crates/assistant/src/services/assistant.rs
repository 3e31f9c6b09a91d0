//! One chat turn, from user message to assembled payload.
//!
//! # Stages
//!
//! 1. Language detection and profile lookup (a failed lookup means no profile)
//! 2. Completion through [`FailoverOrchestrator`]
//! 3. Intent classification over the message and the reply
//! 4. When the intent gate allows it: staged search, filter and rank, bundles
//! 5. Assembly and sanitization
//!
//! Analytics are spawned and never awaited. A health pass, when one is due,
//! is handed back to the caller to start once the response is out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};
use vitaguide_core::{ConversationTurn, Profile, UserId};

use super::assembler::{ChatResponse, ResponseParts, assemble};
use crate::analytics::{AnalyticsSink, record_detached};
use crate::catalog::ranking::Ranker;
use crate::catalog::{
    CollectionEntry, ComboMatcher, ComboSelection, ProductSearch, ScoringWeights,
    SearchOrchestrator,
};
use crate::intent::{self, fallback_collections};
use crate::language::LanguageDetector;
use crate::profiles::ProfileStore;
use crate::providers::prompt::profile_context;
use crate::providers::{
    CompletionProvider, CompletionRequest, CooldownTracker, FailoverOrchestrator, HealthCheckJob,
    HealthScheduler, ProviderId, ReplySource,
};

/// Inbound chat turn.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Preferred primary provider; defaults to A.
    #[serde(default)]
    pub provider: Option<ProviderId>,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
}

impl ChatRequest {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// The payload plus any deferred work.
#[must_use]
pub struct ChatOutcome {
    pub response: ChatResponse,
    /// Start this after the response has been sent.
    pub health_check: Option<HealthCheckJob>,
}

/// External services the pipeline talks to.
pub struct Collaborators {
    pub providers: Vec<Arc<dyn CompletionProvider>>,
    pub catalog: Arc<dyn ProductSearch>,
    pub profiles: Arc<dyn ProfileStore>,
    pub language: Arc<dyn LanguageDetector>,
    pub analytics: Arc<dyn AnalyticsSink>,
}

/// The chat pipeline. Cheap to clone.
#[derive(Clone)]
pub struct Assistant {
    inner: Arc<AssistantInner>,
}

struct AssistantInner {
    failover: FailoverOrchestrator,
    health: HealthScheduler,
    catalog: Arc<dyn ProductSearch>,
    search: SearchOrchestrator,
    ranker: Ranker,
    combos: ComboMatcher,
    profiles: Arc<dyn ProfileStore>,
    language: Arc<dyn LanguageDetector>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl Assistant {
    #[must_use]
    pub fn new(
        collaborators: Collaborators,
        tracker: CooldownTracker,
        weights: ScoringWeights,
    ) -> Self {
        let Collaborators {
            providers,
            catalog,
            profiles,
            language,
            analytics,
        } = collaborators;

        let failover = FailoverOrchestrator::new(&providers, tracker.clone());
        let health = HealthScheduler::new(tracker, providers, Arc::clone(&analytics));

        Self {
            inner: Arc::new(AssistantInner {
                failover,
                health,
                search: SearchOrchestrator::new(Arc::clone(&catalog)),
                combos: ComboMatcher::new(Arc::clone(&catalog)),
                catalog,
                ranker: Ranker::new(weights),
                profiles,
                language,
                analytics,
            }),
        }
    }

    /// Circuit state shared with the failover stage.
    #[must_use]
    pub fn tracker(&self) -> &CooldownTracker {
        self.inner.failover.tracker()
    }

    pub async fn handle(&self, request: &ChatRequest) -> ChatOutcome {
        self.handle_at(request, Utc::now()).await
    }

    /// Run one turn with an explicit clock.
    #[instrument(skip_all, fields(user_id = ?request.user_id.as_ref().map(UserId::as_str)))]
    pub async fn handle_at(&self, request: &ChatRequest, now: DateTime<Utc>) -> ChatOutcome {
        let inner = &*self.inner;

        let profile = self.load_profile(request.user_id.as_ref()).await;
        let language = profile
            .as_ref()
            .and_then(|p| p.language)
            .unwrap_or_else(|| inner.language.detect(&request.message));
        let context = profile_context(profile.as_ref());

        let primary = request.provider.unwrap_or(ProviderId::A);
        let completion = CompletionRequest {
            message: &request.message,
            user_id: request.user_id.as_ref(),
            profile_context: &context,
            history: &request.conversation_history,
            language,
        };
        let outcome = inner.failover.complete_at(primary, &completion, now).await;

        let collections = self.collections().await;
        let intent = intent::classify(
            &request.message,
            &outcome.reply,
            profile.as_ref(),
            &collections,
        );
        debug!(gate = ?intent.search_gate, goal = ?intent.primary_goal, "Intent classified");

        let (ranked, combos) = if intent.search_permitted() {
            let candidates = inner
                .search
                .find(&intent, &request.message, &outcome.reply)
                .await;
            let ranked = inner
                .ranker
                .filter_and_rank(candidates, &intent, profile.as_ref());
            let combos = inner.combos.select(&intent, profile.as_ref(), &ranked).await;
            (ranked, combos)
        } else {
            (Vec::new(), ComboSelection::default())
        };

        let response = assemble(
            ResponseParts {
                reply: outcome.reply,
                provider_products: outcome.products,
                ranked,
                combos,
                intent,
                source: outcome.source,
            },
            now,
        );

        if outcome.source != ReplySource::Provider(primary) {
            record_detached(
                &inner.analytics,
                "provider_fallback",
                json!({
                    "primary": primary.as_str(),
                    "servedBy": outcome.source.as_str(),
                    "attempted": outcome.attempted.iter().map(|id| id.as_str()).collect::<Vec<_>>(),
                }),
            );
        }
        record_detached(
            &inner.analytics,
            "chat_message",
            json!({
                "userId": request.user_id.as_ref().map(UserId::as_str),
                "language": language.code(),
                "provider": response.provider.as_str(),
                "searchGate": response.intent.search_gate,
                "primaryGoal": response.intent.primary_goal,
                "productCount": response.recommended_products.len(),
                "comboCount": response.recommended_combos.as_ref().map_or(0, Vec::len),
            }),
        );

        ChatOutcome {
            response,
            health_check: outcome
                .schedule_health_check
                .then(|| inner.health.job()),
        }
    }

    async fn load_profile(&self, user_id: Option<&UserId>) -> Option<Profile> {
        let user_id = user_id?;
        match self.inner.profiles.get_profile(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Profile lookup failed, continuing without profile");
                None
            }
        }
    }

    /// Live collection table, or the static one when the catalogue has none.
    async fn collections(&self) -> Vec<CollectionEntry> {
        match self.inner.catalog.collections().await {
            Ok(collections) if !collections.is_empty() => collections,
            Ok(_) => fallback_collections(),
            Err(e) => {
                warn!(error = %e, "Collection lookup failed, using static table");
                fallback_collections()
            }
        }
    }
}
