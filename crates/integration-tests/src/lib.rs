//! Integration test support for the VitaGuide assistant.
//!
//! Everything here runs in-process: completion providers and the catalogue
//! are scripted fakes, profiles and analytics live in memory, and HTTP tests
//! drive the real router with `tower::ServiceExt::oneshot`.
//!
//! # Test Categories
//!
//! - `chat_pipeline` - end-to-end turns through [`Assistant`]
//! - `http_api` - status codes, headers, and payload shape of the router

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use chrono::TimeDelta;
use rust_decimal::Decimal;
use vitaguide_assistant::analytics::MemorySink;
use vitaguide_assistant::catalog::{
    CollectionEntry, ProductSearch, ScoringWeights, SearchError, SearchOptions,
};
use vitaguide_assistant::language::KeywordLanguageDetector;
use vitaguide_assistant::profiles::MemoryProfileStore;
use vitaguide_assistant::providers::{
    Completion, CompletionProvider, CompletionRequest, CooldownTracker, ProviderError, ProviderId,
};
use vitaguide_assistant::rate_limit::RateLimiter;
use vitaguide_assistant::routes;
use vitaguide_assistant::services::{Assistant, Collaborators};
use vitaguide_assistant::state::AppState;
use vitaguide_assistant::store::MemoryStore;
use vitaguide_core::{
    CurrencyCode, Language, Price, ProductCandidate, Profile, UsageInstructions, VariantId,
};

// =============================================================================
// Completion providers
// =============================================================================

/// What a [`ScriptedProvider`] does when asked for a reply.
#[derive(Debug, Clone)]
pub enum Behaviour {
    Reply(String),
    Quota(Option<Duration>),
    Fail,
}

impl Behaviour {
    #[must_use]
    pub fn reply(text: &str) -> Self {
        Self::Reply(text.to_string())
    }
}

/// A provider whose behaviour can be changed between turns.
pub struct ScriptedProvider {
    id: ProviderId,
    behaviour: Mutex<Behaviour>,
    healthy: AtomicBool,
    calls: AtomicUsize,
    probes: AtomicUsize,
}

impl ScriptedProvider {
    #[must_use]
    pub fn new(id: ProviderId, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            id,
            behaviour: Mutex::new(behaviour),
            healthy: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
        })
    }

    pub fn set_behaviour(&self, behaviour: Behaviour) {
        if let Ok(mut current) = self.behaviour.lock() {
            *current = behaviour;
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Number of `generate` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn generate(&self, _request: &CompletionRequest<'_>) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behaviour = self
            .behaviour
            .lock()
            .map(|b| b.clone())
            .unwrap_or(Behaviour::Fail);

        match behaviour {
            Behaviour::Reply(reply) => Ok(Completion {
                reply,
                products: Vec::new(),
            }),
            Behaviour::Quota(retry_after) => Err(ProviderError::Quota {
                provider: self.id,
                retry_after,
            }),
            Behaviour::Fail => Err(ProviderError::Failure {
                provider: self.id,
                message: "connection reset".to_string(),
            }),
        }
    }

    async fn probe_health(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.healthy.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Catalogue
// =============================================================================

/// A plain product at 25 EUR, in stock.
#[must_use]
pub fn product(id: &str, title: &str, tags: &[&str]) -> ProductCandidate {
    ProductCandidate {
        variant_id: VariantId::new(id),
        title: title.to_string(),
        handle: None,
        price: Price::new(Decimal::new(25, 0), CurrencyCode::default()),
        tags: tags.iter().map(ToString::to_string).collect(),
        collection_ids: BTreeSet::new(),
        benefits: Vec::new(),
        target_audience: Vec::new(),
        contraindications: Vec::new(),
        usage: UsageInstructions::default(),
        available: true,
        is_on_sale: false,
    }
}

/// Substring matching over a fixed product list; records every call.
#[derive(Default)]
pub struct InMemoryCatalog {
    products: Vec<ProductCandidate>,
    collections: Vec<CollectionEntry>,
    calls: Mutex<Vec<String>>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn with_products(products: Vec<ProductCandidate>) -> Self {
        Self {
            products,
            ..Self::default()
        }
    }

    /// Calls so far, as `tags:a,b` or `keyword:q`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn log(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl ProductSearch for InMemoryCatalog {
    async fn search_by_keyword(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<ProductCandidate>, SearchError> {
        self.log(format!("keyword:{query}"));
        Ok(self
            .products
            .iter()
            .filter(|p| p.search_text().contains(&query.to_lowercase()))
            .filter(|p| !options.only_on_sale || p.is_on_sale)
            .filter(|p| {
                options
                    .collection
                    .as_ref()
                    .is_none_or(|c| p.collection_ids.contains(c.as_str()))
            })
            .take(options.limit)
            .cloned()
            .collect())
    }

    async fn search_by_tags(
        &self,
        tags: &[&str],
        limit: usize,
    ) -> Result<Vec<ProductCandidate>, SearchError> {
        self.log(format!("tags:{}", tags.join(",")));
        Ok(self
            .products
            .iter()
            .filter(|p| tags.iter().any(|t| p.has_tag(t)))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn collections(&self) -> Result<Vec<CollectionEntry>, SearchError> {
        Ok(self.collections.clone())
    }
}

// =============================================================================
// Harness
// =============================================================================

/// A fully wired assistant over fakes.
pub struct TestHarness {
    pub assistant: Assistant,
    pub provider_a: Arc<ScriptedProvider>,
    pub provider_b: Arc<ScriptedProvider>,
    pub catalog: Arc<InMemoryCatalog>,
    pub profiles: MemoryProfileStore,
    pub analytics: Arc<MemorySink>,
}

impl TestHarness {
    #[must_use]
    pub fn new(a: Behaviour, b: Behaviour, catalog: InMemoryCatalog) -> Self {
        Self::with_profiles(a, b, catalog, Vec::new())
    }

    #[must_use]
    pub fn with_profiles(
        a: Behaviour,
        b: Behaviour,
        catalog: InMemoryCatalog,
        profiles: Vec<Profile>,
    ) -> Self {
        let provider_a = ScriptedProvider::new(ProviderId::A, a);
        let provider_b = ScriptedProvider::new(ProviderId::B, b);
        let catalog = Arc::new(catalog);
        let profiles = MemoryProfileStore::with_profiles(profiles);
        let analytics = Arc::new(MemorySink::default());

        let tracker = CooldownTracker::new(
            Arc::new(MemoryStore::new()),
            TimeDelta::seconds(60),
            TimeDelta::minutes(10),
        );

        let assistant = Assistant::new(
            Collaborators {
                providers: vec![
                    Arc::clone(&provider_a) as Arc<dyn CompletionProvider>,
                    Arc::clone(&provider_b) as Arc<dyn CompletionProvider>,
                ],
                catalog: Arc::clone(&catalog) as Arc<dyn ProductSearch>,
                profiles: Arc::new(profiles.clone()),
                language: Arc::new(KeywordLanguageDetector::new(Language::En)),
                analytics: Arc::clone(&analytics) as _,
            },
            tracker,
            ScoringWeights::default(),
        );

        Self {
            assistant,
            provider_a,
            provider_b,
            catalog,
            profiles,
            analytics,
        }
    }

    /// The router over this harness, limited to `max_requests` per minute.
    #[must_use]
    pub fn router(&self, max_requests: u32) -> Router {
        let limiter = RateLimiter::new(
            Arc::new(MemoryStore::new()),
            max_requests,
            TimeDelta::seconds(60),
        );
        routes::app(AppState::new(self.assistant.clone(), limiter, None))
    }
}

/// A catalogue with a product for most goals.
#[must_use]
pub fn sample_catalog() -> InMemoryCatalog {
    InMemoryCatalog::with_products(vec![
        product("energy-b12", "Vitamin B12 Energy Complex", &["energy", "vitality"]),
        product("iron", "Iron Bisglycinate", &["energy", "fatigue"]),
        product("magnesium", "Magnesium Bisglycinate", &["sleep", "stress"]),
        product("melatonin", "Melatonin Night Drops", &["sleep"]),
        product("vitamin-c", "Vitamin C 1000", &["immunity"]),
        product("vitamin-d", "Vitamin D3 2000 IU", &["immunity"]),
        product("zinc", "Zinc Picolinate", &["immunity"]),
    ])
}
