//! Dietary and budget filtering, then profile-aware scoring.
//!
//! Filtering is fail-open: if the filters would leave nothing, the unfiltered
//! list is used. Scoring adds feature bonuses and subtracts safety penalties;
//! the default penalties outweigh any single bonus.

use std::path::Path;

use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use vitaguide_core::{Gender, GoalKey, Intent, ProductCandidate, Profile, RankedProduct};

use crate::intent::goals;

use super::search::goal_tags;

/// Errors loading a weights file.
#[derive(Debug, Error)]
pub enum WeightsError {
    #[error("failed to read weights file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid weights file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("weight {0} must be a finite, non-negative number")]
    Invalid(&'static str),
}

/// Scoring constants. Penalties are magnitudes and are subtracted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub audience_match: f64,
    pub audience_cap: f64,
    pub benefit_match: f64,
    pub dosage_present: f64,
    pub duration_present: f64,
    pub timing_present: f64,
    pub timing_goal_match: f64,
    pub tips_present: f64,
    pub tips_goal_relevant: f64,
    pub contraindications_listed: f64,
    pub allergy_penalty: f64,
    pub pregnancy_penalty: f64,
    pub minor_penalty: f64,
    pub senior_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            audience_match: 1.0,
            audience_cap: 3.0,
            benefit_match: 2.0,
            dosage_present: 1.0,
            duration_present: 1.0,
            timing_present: 1.0,
            timing_goal_match: 2.0,
            tips_present: 1.0,
            tips_goal_relevant: 1.0,
            contraindications_listed: 0.5,
            allergy_penalty: 5.0,
            pregnancy_penalty: 2.0,
            minor_penalty: 3.0,
            senior_penalty: 2.0,
        }
    }
}

impl ScoringWeights {
    /// Load weights from YAML. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds a
    /// negative or non-finite weight.
    pub fn from_yaml_file(path: &Path) -> Result<Self, WeightsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parse weights from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed YAML or an invalid weight.
    pub fn from_yaml(text: &str) -> Result<Self, WeightsError> {
        let weights: Self = serde_yaml::from_str(text)?;
        weights.validate()?;
        Ok(weights)
    }

    fn validate(&self) -> Result<(), WeightsError> {
        let fields = [
            ("audience_match", self.audience_match),
            ("audience_cap", self.audience_cap),
            ("benefit_match", self.benefit_match),
            ("dosage_present", self.dosage_present),
            ("duration_present", self.duration_present),
            ("timing_present", self.timing_present),
            ("timing_goal_match", self.timing_goal_match),
            ("tips_present", self.tips_present),
            ("tips_goal_relevant", self.tips_goal_relevant),
            ("contraindications_listed", self.contraindications_listed),
            ("allergy_penalty", self.allergy_penalty),
            ("pregnancy_penalty", self.pregnancy_penalty),
            ("minor_penalty", self.minor_penalty),
            ("senior_penalty", self.senior_penalty),
        ];
        match fields.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            Some((name, _)) => Err(WeightsError::Invalid(*name)),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Filtering
// =============================================================================

fn is_free_of_tag(tag: &str) -> bool {
    tag.contains("free") || tag.contains("sans")
}

/// Tagged with an allergen and not also tagged free of it.
fn carries_allergen(product: &ProductCandidate, allergens: &[&str]) -> bool {
    let tags: Vec<String> = product.tags.iter().map(|t| t.to_lowercase()).collect();
    let mentions = |tag: &String| allergens.iter().any(|a| tag.contains(a));

    let tagged = tags.iter().any(|t| mentions(t) && !is_free_of_tag(t));
    let free = tags.iter().any(|t| mentions(t) && is_free_of_tag(t));
    tagged && !free
}

/// Whether one product meets every dietary and budget constraint, with no
/// fail-open fallback.
pub(crate) fn passes(product: &ProductCandidate, intent: &Intent) -> bool {
    let dietary = intent.dietary;

    if dietary.require_halal && !product.has_tag_word("halal") {
        return false;
    }
    if dietary.require_vegan {
        if !(product.has_tag_word("vegan") || product.has_tag_word("végan")) {
            return false;
        }
    } else if dietary.require_vegetarian
        && !["vegetarian", "végétarien", "vegan", "végan"]
            .iter()
            .any(|t| product.has_tag_word(t))
    {
        return false;
    }
    if dietary.avoid_gluten && carries_allergen(product, &["gluten"]) {
        return false;
    }
    if dietary.avoid_lactose && carries_allergen(product, &["lactose", "dairy"]) {
        return false;
    }
    if let Some(budget) = &intent.budget
        && budget.excludes(&product.price)
    {
        return false;
    }
    true
}

/// Apply the dietary and budget filters, falling back to the input when
/// nothing would survive.
#[must_use]
pub fn filter_candidates(candidates: Vec<ProductCandidate>, intent: &Intent) -> Vec<ProductCandidate> {
    if candidates.is_empty() || (!intent.dietary.any() && intent.budget.is_none()) {
        return candidates;
    }

    let kept: Vec<ProductCandidate> = candidates
        .iter()
        .filter(|p| passes(p, intent))
        .cloned()
        .collect();

    if kept.is_empty() {
        info!(
            count = candidates.len(),
            "Filters removed every candidate, keeping the unfiltered list"
        );
        return candidates;
    }
    kept
}

// =============================================================================
// Scoring
// =============================================================================

const MINOR_AUDIENCE: &[&str] = &["child", "children", "kid", "kids", "teen", "teens", "teenager", "teenagers", "junior", "enfant", "enfants", "adolescent", "adolescents"];
const SENIOR_AUDIENCE: &[&str] = &["senior", "seniors", "elderly", "older", "aîné", "aînés", "âgé", "âgés", "âgées"];
const ADULT_AUDIENCE: &[&str] = &["adult", "adults", "adulte", "adultes"];
const FEMALE_AUDIENCE: &[&str] = &["women", "woman", "female", "femme", "femmes", "féminin"];
const MALE_AUDIENCE: &[&str] = &["men", "man", "male", "homme", "hommes", "masculin"];

const EVENING_TIMING: &[&str] = &["evening", "night", "bedtime", "before bed", "soir", "coucher", "nuit"];
const MORNING_TIMING: &[&str] = &["morning", "breakfast", "matin", "petit-déjeuner", "réveil"];
const EXERCISE_TIMING: &[&str] = &["workout", "exercise", "training", "sport", "effort", "entraînement", "séance"];

const PREGNANCY_TERMS: &[&str] = &["pregnan", "breastfeed", "nursing", "lactation", "enceinte", "grossesse", "allait"];
const MINOR_TERMS: &[&str] = &["child", "under 18", "minor", "teen", "enfant", "moins de 18", "adolescent", "mineur"];
const SENIOR_TERMS: &[&str] = &["senior", "elderly", "over 65", "older adult", "personnes âgées", "plus de 65"];

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

fn has_word(text: &str, vocabulary: &[&str]) -> bool {
    words(text).iter().any(|w| vocabulary.contains(w))
}

fn has_fragment(text: &str, vocabulary: &[&str]) -> bool {
    vocabulary.iter().any(|v| text.contains(v))
}

/// Whether lower-cased `text` speaks to `goal`.
fn mentions_goal(text: &str, goal: GoalKey) -> bool {
    goals::goals_in(text).contains(&goal) || goal_tags(goal).iter().any(|t| text.contains(t))
}

fn lower_join(parts: &[String]) -> String {
    parts.join(" ").to_lowercase()
}

/// Scores candidates against a profile and intent.
#[derive(Debug, Clone, Default)]
pub struct Ranker {
    weights: ScoringWeights,
}

impl Ranker {
    #[must_use]
    pub const fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    #[must_use]
    pub const fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Filter then rank.
    #[must_use]
    pub fn filter_and_rank(
        &self,
        candidates: Vec<ProductCandidate>,
        intent: &Intent,
        profile: Option<&Profile>,
    ) -> Vec<RankedProduct> {
        self.rank(filter_candidates(candidates, intent), intent, profile)
    }

    /// Stable descending sort by score. Without structured product data
    /// anywhere, sort by distance from the budget midpoint instead.
    #[must_use]
    pub fn rank(
        &self,
        candidates: Vec<ProductCandidate>,
        intent: &Intent,
        profile: Option<&Profile>,
    ) -> Vec<RankedProduct> {
        if !candidates.iter().any(ProductCandidate::has_structured_signals) {
            debug!("No structured signals, ranking by budget distance");
            return rank_by_budget(candidates, intent);
        }

        let mut ranked: Vec<RankedProduct> = candidates
            .into_iter()
            .map(|product| {
                let score = self.score(&product, intent, profile);
                RankedProduct { product, score }
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }

    /// Total score for one candidate.
    #[must_use]
    pub fn score(&self, product: &ProductCandidate, intent: &Intent, profile: Option<&Profile>) -> f64 {
        let w = &self.weights;
        let goal = intent.primary_goal;

        let mut score = self.audience_score(product, intent, profile);

        if let Some(goal) = goal {
            let matches = product
                .benefits
                .iter()
                .filter(|b| mentions_goal(&b.to_lowercase(), goal))
                .count();
            score += w.benefit_match * f64::from(u32::try_from(matches).unwrap_or(u32::MAX));
        }

        let usage = &product.usage;
        let present = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.trim().is_empty());
        if present(&usage.dosage) {
            score += w.dosage_present;
        }
        if present(&usage.duration) {
            score += w.duration_present;
        }
        if let Some(timing) = usage.timing.as_deref().filter(|s| !s.trim().is_empty()) {
            score += w.timing_present;
            if goal.is_some_and(|g| timing_fits(&timing.to_lowercase(), g)) {
                score += w.timing_goal_match;
            }
        }
        if let Some(tips) = usage.tips.as_deref().filter(|s| !s.trim().is_empty()) {
            score += w.tips_present;
            if goal.is_some_and(|g| mentions_goal(&tips.to_lowercase(), g)) {
                score += w.tips_goal_relevant;
            }
        }

        if !product.contraindications.is_empty() {
            score += w.contraindications_listed;
        }

        score - self.penalties(product, profile)
    }

    fn audience_score(&self, product: &ProductCandidate, intent: &Intent, profile: Option<&Profile>) -> f64 {
        if product.target_audience.is_empty() {
            return 0.0;
        }
        let text = lower_join(&product.target_audience);
        let mut points = 0.0;

        if let Some(profile) = profile {
            let bracket = if profile.is_minor() {
                Some(MINOR_AUDIENCE)
            } else if profile.is_senior() {
                Some(SENIOR_AUDIENCE)
            } else if profile.age.is_some() {
                Some(ADULT_AUDIENCE)
            } else {
                None
            };
            if bracket.is_some_and(|vocabulary| has_word(&text, vocabulary)) {
                points += self.weights.audience_match;
            }

            let gender = match profile.gender {
                Some(Gender::Female) => Some(FEMALE_AUDIENCE),
                Some(Gender::Male) => Some(MALE_AUDIENCE),
                _ => None,
            };
            if gender.is_some_and(|vocabulary| has_word(&text, vocabulary)) {
                points += self.weights.audience_match;
            }
        }

        if intent.goals().any(|g| mentions_goal(&text, g)) {
            points += self.weights.audience_match;
        }

        points.min(self.weights.audience_cap)
    }

    fn penalties(&self, product: &ProductCandidate, profile: Option<&Profile>) -> f64 {
        let Some(profile) = profile else {
            return 0.0;
        };
        if product.contraindications.is_empty() {
            return 0.0;
        }
        let w = &self.weights;
        let text = lower_join(&product.contraindications);
        let mut penalty = 0.0;

        for allergy in &profile.allergies {
            let allergy = allergy.trim().to_lowercase();
            if !allergy.is_empty() && text.contains(&allergy) {
                penalty += w.allergy_penalty;
            }
        }
        if profile.is_female() && has_fragment(&text, PREGNANCY_TERMS) {
            penalty += w.pregnancy_penalty;
        }
        if profile.is_minor() && has_fragment(&text, MINOR_TERMS) {
            penalty += w.minor_penalty;
        }
        if profile.is_senior() && has_fragment(&text, SENIOR_TERMS) {
            penalty += w.senior_penalty;
        }
        penalty
    }
}

fn timing_fits(timing: &str, goal: GoalKey) -> bool {
    match goal {
        GoalKey::Sleep => has_fragment(timing, EVENING_TIMING),
        GoalKey::Energy => has_fragment(timing, MORNING_TIMING),
        g if g.is_sport() => has_fragment(timing, EXERCISE_TIMING),
        _ => false,
    }
}

fn rank_by_budget(candidates: Vec<ProductCandidate>, intent: &Intent) -> Vec<RankedProduct> {
    let midpoint = intent.budget.as_ref().map(|b| (b.midpoint(), b.currency.clone()));

    let mut ranked: Vec<RankedProduct> = candidates
        .into_iter()
        .map(|product| {
            let distance = midpoint
                .as_ref()
                .filter(|(_, currency)| product.price.is_in(currency))
                .and_then(|(mid, _)| (product.price.amount - mid).abs().to_f64())
                .unwrap_or(0.0);
            RankedProduct {
                product,
                score: -distance,
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use vitaguide_core::{
        BudgetRange, CurrencyCode, DietaryFlags, Price, UsageInstructions, UserId, VariantId,
    };

    use super::*;

    fn product(id: &str, tags: &[&str]) -> ProductCandidate {
        ProductCandidate {
            variant_id: VariantId::new(id),
            title: format!("Product {id}"),
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

    fn priced(id: &str, amount: i64) -> ProductCandidate {
        let mut p = product(id, &[]);
        p.price = Price::new(Decimal::new(amount, 0), CurrencyCode::default());
        p
    }

    fn intent_with(dietary: DietaryFlags) -> Intent {
        Intent {
            dietary,
            ..Intent::default()
        }
    }

    fn ids(products: &[ProductCandidate]) -> Vec<&str> {
        products.iter().map(|p| p.variant_id.as_str()).collect()
    }

    #[test]
    fn test_gluten_tag_excluded_gluten_free_kept() {
        let intent = intent_with(DietaryFlags {
            avoid_gluten: true,
            ..DietaryFlags::default()
        });
        let kept = filter_candidates(
            vec![product("a", &["gluten"]), product("b", &["gluten-free"])],
            &intent,
        );
        assert_eq!(ids(&kept), vec!["b"]);
    }

    #[test]
    fn test_halal_fails_open() {
        let intent = intent_with(DietaryFlags {
            require_halal: true,
            ..DietaryFlags::default()
        });
        let candidates = vec![product("a", &["vegan"]), product("b", &[])];
        let kept = filter_candidates(candidates.clone(), &intent);
        assert_eq!(kept, candidates);
    }

    #[test]
    fn test_negated_lifestyle_tags_do_not_qualify() {
        let intent = intent_with(DietaryFlags {
            require_vegan: true,
            require_halal: true,
            ..DietaryFlags::default()
        });
        let kept = filter_candidates(
            vec![
                product("a", &["non-vegan", "halal"]),
                product("b", &["vegan", "not-halal"]),
                product("c", &["vegan", "halal-certified"]),
            ],
            &intent,
        );
        assert_eq!(ids(&kept), vec!["c"]);
    }

    #[test]
    fn test_vegan_takes_precedence_over_vegetarian() {
        let intent = intent_with(DietaryFlags {
            require_vegan: true,
            require_vegetarian: true,
            ..DietaryFlags::default()
        });
        let kept = filter_candidates(
            vec![product("a", &["vegetarian"]), product("b", &["vegan"])],
            &intent,
        );
        assert_eq!(ids(&kept), vec!["b"]);
    }

    #[test]
    fn test_budget_filter_same_currency_only() {
        let mut foreign = priced("usd", 500);
        foreign.price = Price::new(Decimal::new(500, 0), CurrencyCode::parse("USD").expect("ok"));
        let intent = Intent {
            budget: Some(BudgetRange {
                min: Decimal::new(10, 0),
                max: Decimal::new(30, 0),
                currency: CurrencyCode::default(),
            }),
            ..Intent::default()
        };
        let kept = filter_candidates(vec![priced("cheap", 20), priced("dear", 80), foreign], &intent);
        assert_eq!(ids(&kept), vec!["cheap", "usd"]);
    }

    #[test]
    fn test_allergy_penalty_sinks_candidate() {
        let mut safe = product("safe", &[]);
        safe.usage.dosage = Some("1 capsule".to_string());
        let mut risky = safe.clone();
        risky.variant_id = VariantId::new("risky");
        risky.usage.timing = Some("In the evening".to_string());
        risky.contraindications = vec!["Contains fish: avoid if allergic".to_string()];

        let mut profile = Profile::empty(UserId::new("u1"));
        profile.allergies = vec!["fish".to_string()];
        let intent = Intent {
            primary_goal: Some(GoalKey::Sleep),
            ..Intent::default()
        };

        let ranked = Ranker::default().rank(vec![risky, safe], &intent, Some(&profile));
        assert_eq!(ranked[0].product.variant_id.as_str(), "safe");
        assert!(ranked[1].score < 0.0);
    }

    #[test]
    fn test_default_penalties_outweigh_single_bonuses() {
        let w = ScoringWeights::default();
        let largest_bonus = [
            w.audience_cap,
            w.benefit_match,
            w.dosage_present,
            w.duration_present,
            w.timing_present + w.timing_goal_match,
            w.tips_present + w.tips_goal_relevant,
        ]
        .into_iter()
        .fold(0.0_f64, f64::max);
        assert!(w.allergy_penalty > largest_bonus);
    }

    #[test]
    fn test_full_score_for_sleep_product() {
        let mut p = product("p", &[]);
        p.target_audience = vec!["Adult women with sleep troubles".to_string()];
        p.benefits = vec!["Supports restful sleep".to_string(), "Bone health".to_string()];
        p.usage = UsageInstructions {
            dosage: Some("2 capsules".to_string()),
            timing: Some("30 minutes before bed".to_string()),
            duration: Some("1 month".to_string()),
            tips: Some("Avoid screens to sleep better".to_string()),
        };
        p.contraindications = vec!["Pregnancy".to_string()];

        let mut profile = Profile::empty(UserId::new("u1"));
        profile.age = Some(30);
        profile.gender = Some(Gender::Female);
        let intent = Intent {
            primary_goal: Some(GoalKey::Sleep),
            ..Intent::default()
        };

        // audience 3 + benefit 2 + dosage 1 + duration 1 + timing 3 + tips 2
        // + listed 0.5 - pregnancy 2
        let score = Ranker::default().score(&p, &intent, Some(&profile));
        assert!((score - 10.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_minor_and_senior_penalties() {
        let mut p = product("p", &[]);
        p.contraindications = vec!["Not for children or the elderly".to_string()];
        let ranker = Ranker::default();
        let intent = Intent::default();

        let mut profile = Profile::empty(UserId::new("u1"));
        profile.age = Some(15);
        assert!((ranker.score(&p, &intent, Some(&profile)) - (0.5 - 3.0)).abs() < f64::EPSILON);

        profile.age = Some(70);
        assert!((ranker.score(&p, &intent, Some(&profile)) - (0.5 - 2.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_budget_midpoint_fallback() {
        let intent = Intent {
            budget: Some(BudgetRange {
                min: Decimal::new(10, 0),
                max: Decimal::new(30, 0),
                currency: CurrencyCode::default(),
            }),
            ..Intent::default()
        };
        let ranked = Ranker::default().rank(
            vec![priced("far", 50), priced("near", 21), priced("mid", 12)],
            &intent,
            None,
        );
        let order: Vec<_> = ranked.iter().map(|r| r.product.variant_id.as_str()).collect();
        assert_eq!(order, vec!["near", "mid", "far"]);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut a = product("a", &[]);
        a.usage.dosage = Some("1".to_string());
        let mut b = product("b", &[]);
        b.usage.duration = Some("1 month".to_string());
        let ranked = Ranker::default().rank(vec![a, b], &Intent::default(), None);
        let order: Vec<_> = ranked.iter().map(|r| r.product.variant_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_weights_from_yaml_keep_defaults() {
        let weights = ScoringWeights::from_yaml("allergy_penalty: 8.0\n").expect("parse");
        assert!((weights.allergy_penalty - 8.0).abs() < f64::EPSILON);
        assert!((weights.benefit_match - 2.0).abs() < f64::EPSILON);

        assert!(matches!(
            ScoringWeights::from_yaml("minor_penalty: -1\n"),
            Err(WeightsError::Invalid("minor_penalty"))
        ));
    }
}
