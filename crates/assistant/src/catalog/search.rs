//! Staged product lookup driven by an intent.
//!
//! 1. Tag search per goal (skipped when a sale or collection was asked for).
//! 2. Keyword fallback when stage 1 found nothing.
//! 3. Sale and collection modifiers on the keyword queries, with further
//!    keywords tried until the target is met.
//! 4. Complementary nutrients for the first result.
//!
//! Failures of the search primitive are logged and skipped.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument, warn};
use vitaguide_core::{GoalKey, Intent, ProductCandidate, VariantId};

use crate::intent::patterns;

use super::{ProductSearch, SearchError, SearchOptions};

/// Unique results wanted before later stages are skipped.
pub const TARGET_RESULTS: usize = 3;

/// Complementary products appended at most.
pub const MAX_COMPLEMENTARY: usize = 2;

/// Safe defaults for a deficiency with no nutrient named.
const DEFICIENCY_DEFAULTS: &[&str] = &["vitamin d", "magnesium", "iron", "vitamin b12"];

/// Terms too broad to search on.
const GENERIC_TERMS: &[&str] = &[
    "supplement",
    "supplements",
    "complement",
    "complements",
    "complément",
    "compléments",
    "vitamin",
    "vitamins",
    "vitamine",
    "vitamines",
    "product",
    "produit",
];

/// Storefront tags for each goal.
#[must_use]
pub const fn goal_tags(goal: GoalKey) -> &'static [&'static str] {
    match goal {
        GoalKey::Energy => &["energy", "energie", "vitality", "fatigue"],
        GoalKey::Sleep => &["sleep", "sommeil", "relaxation"],
        GoalKey::Stress => &["stress", "anti-stress", "relaxation"],
        GoalKey::Immunity => &["immunity", "immunite", "defenses"],
        GoalKey::Digestion => &["digestion", "probiotics", "gut-health"],
        GoalKey::WeightLoss => &["weight-loss", "minceur", "detox"],
        GoalKey::MuscleGain => &["muscle", "protein", "sport"],
        GoalKey::Fitness => &["sport", "fitness", "recovery"],
        GoalKey::Wellness => &["wellness", "bien-etre", "multivitamin"],
        GoalKey::Heart => &["heart", "cardio", "omega-3"],
    }
}

/// Keywords for goals that have a usual go-to nutrient.
#[must_use]
pub const fn goal_keywords(goal: GoalKey) -> &'static [&'static str] {
    match goal {
        GoalKey::WeightLoss => &["green tea", "glucomannan", "chromium"],
        GoalKey::Sleep => &["melatonin", "magnesium", "valerian"],
        GoalKey::Stress => &["ashwagandha", "magnesium", "rhodiola"],
        GoalKey::Energy => &["vitamin b12", "iron", "ginseng"],
        GoalKey::Immunity => &["vitamin c", "zinc", "vitamin d"],
        GoalKey::MuscleGain => &["protein", "creatine"],
        GoalKey::Digestion
        | GoalKey::Fitness
        | GoalKey::Wellness
        | GoalKey::Heart => &[],
    }
}

/// Nutrients that pair well with a given one.
#[must_use]
pub fn complements_of(nutrient: &str) -> &'static [&'static str] {
    match nutrient {
        "vitamin d" => &["magnesium", "vitamin k2"],
        "iron" => &["vitamin c"],
        "calcium" => &["vitamin d", "magnesium"],
        "magnesium" => &["vitamin b"],
        "zinc" => &["vitamin c"],
        "vitamin b12" => &["folic acid"],
        "omega-3" => &["vitamin d"],
        "collagen" => &["vitamin c"],
        "turmeric" => &["omega-3"],
        _ => &[],
    }
}

fn is_actionable(term: &str) -> bool {
    !GENERIC_TERMS.contains(&term)
}

/// Keywords for stage 2: nutrients in the reply, else in the message, else
/// the goal table, else deficiency defaults.
#[must_use]
pub fn derive_keywords(intent: &Intent, message: &str, reply: &str) -> Vec<String> {
    let from_text = |text: &str| -> Vec<String> {
        patterns::nutrients_in(&text.to_lowercase())
            .into_iter()
            .filter(|term| is_actionable(term))
            .map(str::to_string)
            .collect()
    };

    let from_reply = from_text(reply);
    if !from_reply.is_empty() {
        return from_reply;
    }
    let from_message = from_text(message);
    if !from_message.is_empty() {
        return from_message;
    }

    let from_goal: Vec<String> = intent
        .primary_goal
        .map(goal_keywords)
        .unwrap_or_default()
        .iter()
        .filter(|term| is_actionable(term))
        .map(ToString::to_string)
        .collect();
    if !from_goal.is_empty() {
        return from_goal;
    }

    if intent.deficiency_intent {
        return DEFICIENCY_DEFAULTS.iter().map(ToString::to_string).collect();
    }
    Vec::new()
}

/// Unique, available products by variant id, in arrival order.
#[derive(Debug, Default)]
struct Accumulator {
    products: Vec<ProductCandidate>,
    seen: HashSet<VariantId>,
}

impl Accumulator {
    /// Add from `batch` until `cap` products are held. Returns how many were added.
    fn extend(&mut self, batch: Vec<ProductCandidate>, cap: usize) -> usize {
        let mut added = 0;
        for product in batch {
            if self.products.len() >= cap {
                break;
            }
            if product.available && self.seen.insert(product.variant_id.clone()) {
                self.products.push(product);
                added += 1;
            }
        }
        added
    }

    fn len(&self) -> usize {
        self.products.len()
    }

    fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    fn is_full(&self) -> bool {
        self.len() >= TARGET_RESULTS
    }
}

fn log_failure(stage: &str, query: &str, error: &SearchError) {
    warn!(stage, query, error = %error, "Product search failed, continuing");
}

/// Runs the staged lookup.
#[derive(Clone)]
pub struct SearchOrchestrator {
    search: Arc<dyn ProductSearch>,
}

impl SearchOrchestrator {
    #[must_use]
    pub fn new(search: Arc<dyn ProductSearch>) -> Self {
        Self { search }
    }

    /// Candidates for an intent that permits search, unranked.
    #[instrument(skip_all, fields(gate = ?intent.search_gate))]
    pub async fn find(&self, intent: &Intent, message: &str, reply: &str) -> Vec<ProductCandidate> {
        let mut found = Accumulator::default();

        if !intent.has_search_modifier() {
            self.tag_stage(intent, &mut found).await;
        }

        if found.is_empty() {
            let keywords = derive_keywords(intent, message, reply);
            self.keyword_stage(intent, &keywords, &mut found).await;
        }

        self.complementary_stage(&mut found).await;

        debug!(count = found.len(), "Search finished");
        found.products
    }

    async fn tag_stage(&self, intent: &Intent, found: &mut Accumulator) {
        for goal in intent.goals() {
            if found.is_full() {
                break;
            }
            let tags = goal_tags(goal);
            match self.search.search_by_tags(tags, TARGET_RESULTS).await {
                Ok(batch) => {
                    let added = found.extend(batch, TARGET_RESULTS);
                    debug!(goal = %goal, added, "Tag search");
                }
                Err(e) => log_failure("tags", goal.as_str(), &e),
            }
        }
    }

    async fn keyword_stage(&self, intent: &Intent, keywords: &[String], found: &mut Accumulator) {
        let options = SearchOptions {
            only_on_sale: intent.sale_request,
            collection: intent.requested_collection.clone(),
            limit: TARGET_RESULTS,
        };

        if keywords.is_empty() {
            if intent.has_search_modifier() {
                self.keyword_query("", &options, found).await;
            }
            return;
        }

        for keyword in keywords {
            if found.is_full() {
                break;
            }
            self.keyword_query(keyword, &options, found).await;
        }
    }

    async fn keyword_query(&self, keyword: &str, options: &SearchOptions, found: &mut Accumulator) {
        match self.search.search_by_keyword(keyword, options).await {
            Ok(batch) => {
                let added = found.extend(batch, TARGET_RESULTS);
                debug!(keyword, added, "Keyword search");
            }
            Err(e) => log_failure("keyword", keyword, &e),
        }
    }

    async fn complementary_stage(&self, found: &mut Accumulator) {
        let Some(first) = found.products.first() else {
            return;
        };
        let complements: Vec<&'static str> = patterns::nutrients_in(&first.search_text())
            .into_iter()
            .next()
            .map(complements_of)
            .unwrap_or_default()
            .to_vec();

        let cap = found.len() + MAX_COMPLEMENTARY;
        let options = SearchOptions::with_limit(MAX_COMPLEMENTARY);
        for nutrient in complements {
            if found.len() >= cap {
                break;
            }
            match self.search.search_by_keyword(nutrient, &options).await {
                Ok(batch) => {
                    found.extend(batch, cap);
                }
                Err(e) => log_failure("complementary", nutrient, &e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use vitaguide_core::{CurrencyCode, Price, SearchGate, UsageInstructions};

    use super::*;
    use crate::catalog::CollectionEntry;

    fn product(id: &str, title: &str, tags: &[&str]) -> ProductCandidate {
        ProductCandidate {
            variant_id: VariantId::new(id),
            title: title.to_string(),
            handle: None,
            price: Price::new(Decimal::new(20, 0), CurrencyCode::default()),
            tags: tags.iter().map(ToString::to_string).collect(),
            collection_ids: Default::default(),
            benefits: Vec::new(),
            target_audience: Vec::new(),
            contraindications: Vec::new(),
            usage: UsageInstructions::default(),
            available: true,
            is_on_sale: false,
        }
    }

    /// Matches on tags and title words; records every call.
    #[derive(Default)]
    struct Catalogue {
        products: Vec<ProductCandidate>,
        fail_keywords: bool,
        calls: Mutex<Vec<String>>,
    }

    impl Catalogue {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl ProductSearch for Catalogue {
        async fn search_by_keyword(
            &self,
            query: &str,
            options: &SearchOptions,
        ) -> Result<Vec<ProductCandidate>, SearchError> {
            self.calls.lock().expect("lock").push(format!("keyword:{query}"));
            if self.fail_keywords {
                return Err(SearchError::RateLimited(1));
            }
            Ok(self
                .products
                .iter()
                .filter(|p| p.search_text().contains(query))
                .filter(|p| !options.only_on_sale || p.is_on_sale)
                .take(options.limit)
                .cloned()
                .collect())
        }

        async fn search_by_tags(
            &self,
            tags: &[&str],
            limit: usize,
        ) -> Result<Vec<ProductCandidate>, SearchError> {
            self.calls.lock().expect("lock").push(format!("tags:{}", tags.join(",")));
            Ok(self
                .products
                .iter()
                .filter(|p| tags.iter().any(|t| p.has_tag(t)))
                .take(limit)
                .cloned()
                .collect())
        }

        async fn collections(&self) -> Result<Vec<CollectionEntry>, SearchError> {
            Ok(Vec::new())
        }
    }

    fn intent(goal: Option<GoalKey>) -> Intent {
        Intent {
            primary_goal: goal,
            search_gate: SearchGate::ExplicitRequest,
            ..Intent::default()
        }
    }

    #[tokio::test]
    async fn test_tag_stage_uses_goal_tags() {
        let catalogue = Arc::new(Catalogue {
            products: vec![product("v1", "Energy Complex", &["energy"])],
            ..Catalogue::default()
        });
        let orchestrator = SearchOrchestrator::new(catalogue.clone());

        let found = orchestrator.find(&intent(Some(GoalKey::Energy)), "", "").await;

        assert_eq!(found.len(), 1);
        assert_eq!(catalogue.calls()[0], "tags:energy,energie,vitality,fatigue");
    }

    #[tokio::test]
    async fn test_keyword_fallback_prefers_reply_terms() {
        let catalogue = Arc::new(Catalogue {
            products: vec![
                product("v1", "Zinc Picolinate", &[]),
                product("v2", "Magnesium Marin", &[]),
            ],
            ..Catalogue::default()
        });
        let orchestrator = SearchOrchestrator::new(catalogue.clone());

        let found = orchestrator
            .find(&intent(None), "I need iron", "Try magnesium before bed.")
            .await;

        assert_eq!(found[0].title, "Magnesium Marin");
        assert!(catalogue.calls().contains(&"keyword:magnesium".to_string()));
        assert!(!catalogue.calls().contains(&"keyword:iron".to_string()));
    }

    #[tokio::test]
    async fn test_deficiency_defaults() {
        let orchestrator = SearchOrchestrator::new(Arc::new(Catalogue::default()));
        let intent = Intent {
            deficiency_intent: true,
            ..intent(None)
        };
        assert_eq!(
            derive_keywords(&intent, "i'm lacking something", ""),
            vec!["vitamin d", "magnesium", "iron", "vitamin b12"]
        );
        assert!(orchestrator.find(&intent, "i'm lacking something", "").await.is_empty());
    }

    #[tokio::test]
    async fn test_sale_request_skips_tags_and_filters() {
        let mut on_sale = product("v2", "Magnesium Promo", &["sleep"]);
        on_sale.is_on_sale = true;
        let catalogue = Arc::new(Catalogue {
            products: vec![product("v1", "Magnesium Classic", &["sleep"]), on_sale],
            ..Catalogue::default()
        });
        let orchestrator = SearchOrchestrator::new(catalogue.clone());
        let intent = Intent {
            sale_request: true,
            ..intent(Some(GoalKey::Sleep))
        };

        let found = orchestrator.find(&intent, "anything on sale?", "").await;

        assert!(catalogue.calls().iter().all(|c| !c.starts_with("tags:")));
        assert!(found.iter().all(|p| p.is_on_sale));
        assert_eq!(found[0].title, "Magnesium Promo");
    }

    #[tokio::test]
    async fn test_sale_without_keywords_issues_unscoped_query() {
        let catalogue = Arc::new(Catalogue::default());
        let orchestrator = SearchOrchestrator::new(catalogue.clone());
        let intent = Intent {
            sale_request: true,
            ..intent(None)
        };

        orchestrator.find(&intent, "promos?", "").await;
        assert_eq!(catalogue.calls(), vec!["keyword:".to_string()]);
    }

    #[tokio::test]
    async fn test_complementary_adds_at_most_two() {
        let catalogue = Arc::new(Catalogue {
            products: vec![
                product("v1", "Vitamin D3 2000 IU", &["immunity"]),
                product("v2", "Magnesium Bisglycinate", &[]),
                product("v3", "Magnesium Citrate", &[]),
                product("v4", "Vitamin K2 MK-7", &[]),
            ],
            ..Catalogue::default()
        });
        let orchestrator = SearchOrchestrator::new(catalogue.clone());

        let found = orchestrator.find(&intent(Some(GoalKey::Immunity)), "", "").await;

        assert_eq!(found.len(), 3);
        assert_eq!(found[0].variant_id.as_str(), "v1");
        assert!(catalogue.calls().contains(&"keyword:magnesium".to_string()));
    }

    #[tokio::test]
    async fn test_failures_are_swallowed_and_unavailable_dropped() {
        let mut gone = product("v1", "Energy Gone", &["energy"]);
        gone.available = false;
        let catalogue = Arc::new(Catalogue {
            products: vec![gone],
            fail_keywords: true,
            ..Catalogue::default()
        });
        let orchestrator = SearchOrchestrator::new(catalogue);

        let found = orchestrator
            .find(&intent(Some(GoalKey::Energy)), "", "take iron")
            .await;
        assert!(found.is_empty());
    }
}
