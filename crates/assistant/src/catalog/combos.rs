//! Predefined product bundles.

use std::sync::Arc;

use tracing::{debug, instrument, warn};
use vitaguide_core::{ComboResult, Gender, GoalKey, Intent, ProductCandidate, Profile, RankedProduct};

use crate::intent::{goals, patterns};

use super::ranking::passes;
use super::{ProductSearch, SearchOptions};

/// Goal-matched bundles returned at most.
pub const MAX_GOAL_COMBOS: usize = 2;

/// Generic bundles offered when combinations were asked for and none matched.
pub const GENERIC_COMBO_COUNT: usize = 2;

/// Products fetched per member before filtering.
const MEMBER_SEARCH_LIMIT: usize = 3;

/// What a bundle's applicability predicate sees.
#[derive(Debug, Clone, Default)]
pub struct ComboContext {
    pub goals: Vec<GoalKey>,
    pub age: Option<u8>,
    pub gender: Option<Gender>,
}

impl ComboContext {
    fn has(&self, goal: GoalKey) -> bool {
        self.goals.contains(&goal)
    }

    fn is_senior(&self) -> bool {
        self.age.is_some_and(|age| age >= vitaguide_core::types::profile::SENIOR_AGE)
    }
}

/// A bundle: members are nutrient keywords resolved through product search.
#[derive(Debug, Clone, Copy)]
pub struct ComboDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub benefits: &'static str,
    pub members: &'static [&'static str],
    pub generic: bool,
    pub applies: fn(&ComboContext) -> bool,
}

pub const COMBO_DEFINITIONS: &[ComboDefinition] = &[
    ComboDefinition {
        name: "Daily Essentials",
        description: "The everyday base: vitamin D, magnesium and omega-3.",
        benefits: "Covers the most common shortfalls and supports general vitality.",
        members: &["vitamin d", "magnesium", "omega-3"],
        generic: true,
        applies: |c| c.has(GoalKey::Wellness),
    },
    ComboDefinition {
        name: "Immunity Shield",
        description: "Vitamin C, zinc and vitamin D for the winter months.",
        benefits: "Supports the normal function of the immune system.",
        members: &["vitamin c", "zinc", "vitamin d"],
        generic: true,
        applies: |c| c.has(GoalKey::Immunity),
    },
    ComboDefinition {
        name: "Sleep & Relaxation Duo",
        description: "Magnesium with melatonin for an easier evening wind-down.",
        benefits: "Helps reduce the time taken to fall asleep and eases nervous tension.",
        members: &["magnesium", "melatonin"],
        generic: false,
        applies: |c| c.has(GoalKey::Sleep) || c.has(GoalKey::Stress),
    },
    ComboDefinition {
        name: "Energy Boost Pack",
        description: "Vitamin B12, iron and ginseng against tiredness.",
        benefits: "Contributes to the reduction of tiredness and fatigue.",
        members: &["vitamin b12", "iron", "ginseng"],
        generic: false,
        applies: |c| c.has(GoalKey::Energy),
    },
    ComboDefinition {
        name: "Women's Balance",
        description: "Iron, folic acid and magnesium for women's needs.",
        benefits: "Supports energy levels and the menstrual cycle.",
        members: &["iron", "folic acid", "magnesium"],
        generic: false,
        applies: |c| c.gender == Some(Gender::Female) && !c.is_senior(),
    },
    ComboDefinition {
        name: "Senior Vitality",
        description: "Vitamin D, calcium and omega-3 for later years.",
        benefits: "Supports bones, muscles and heart function.",
        members: &["vitamin d", "calcium", "omega-3"],
        generic: false,
        applies: ComboContext::is_senior,
    },
    ComboDefinition {
        name: "Sport Recovery Stack",
        description: "Protein, creatine and magnesium around training.",
        benefits: "Supports muscle recovery and performance.",
        members: &["protein", "creatine", "magnesium"],
        generic: false,
        applies: |c| c.goals.iter().any(|g| g.is_sport()),
    },
    ComboDefinition {
        name: "Digestive Comfort",
        description: "Probiotics with turmeric for a calmer gut.",
        benefits: "Supports a balanced gut flora and comfortable digestion.",
        members: &["probiotics", "turmeric"],
        generic: false,
        applies: |c| c.has(GoalKey::Digestion),
    },
    ComboDefinition {
        name: "Heart Health Trio",
        description: "Omega-3, CoQ10 and magnesium for the heart.",
        benefits: "Supports normal heart function.",
        members: &["omega-3", "coq10", "magnesium"],
        generic: false,
        applies: |c| c.has(GoalKey::Heart),
    },
    ComboDefinition {
        name: "Slim Support",
        description: "Green tea and glucomannan alongside a balanced diet.",
        benefits: "Supports weight management within a calorie-controlled diet.",
        members: &["green tea", "glucomannan"],
        generic: false,
        applies: |c| c.has(GoalKey::WeightLoss),
    },
];

/// Context from the stored profile, or from the intent without one.
#[must_use]
pub fn combo_context(intent: &Intent, profile: Option<&Profile>) -> ComboContext {
    match profile {
        Some(profile) => {
            let mut stored: Vec<GoalKey> = Vec::new();
            for goal in profile.goals.iter().filter_map(|g| goals::goal_from_label(g)) {
                if !stored.contains(&goal) {
                    stored.push(goal);
                }
            }
            ComboContext {
                goals: if stored.is_empty() { intent.goals().collect() } else { stored },
                age: profile.age,
                gender: profile.gender,
            }
        }
        None => ComboContext {
            goals: intent.goals().collect(),
            ..ComboContext::default()
        },
    }
}

/// Whether a product is one of the bundle's members.
fn is_member(product: &ProductCandidate, definition: &ComboDefinition) -> bool {
    let text = product.search_text();
    let nutrients = patterns::nutrients_in(&text);
    definition
        .members
        .iter()
        .any(|m| nutrients.contains(m) || text.contains(m))
}

/// Bundles picked for one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComboSelection {
    pub recommended: Vec<ComboResult>,
    pub suggested: Option<ComboResult>,
}

/// Resolves bundle definitions into products.
#[derive(Clone)]
pub struct ComboMatcher {
    search: Arc<dyn ProductSearch>,
    definitions: &'static [ComboDefinition],
}

impl ComboMatcher {
    #[must_use]
    pub fn new(search: Arc<dyn ProductSearch>) -> Self {
        Self {
            search,
            definitions: COMBO_DEFINITIONS,
        }
    }

    #[instrument(skip_all)]
    pub async fn select(
        &self,
        intent: &Intent,
        profile: Option<&Profile>,
        ranked: &[RankedProduct],
    ) -> ComboSelection {
        let context = combo_context(intent, profile);

        let matching = self.definitions.iter().filter(|d| (d.applies)(&context));
        let mut recommended = self.resolve_up_to(matching, MAX_GOAL_COMBOS, intent).await;

        if recommended.is_empty() && intent.combo_request {
            debug!("No bundle matched, offering generic bundles");
            let generic = self.definitions.iter().filter(|d| d.generic);
            recommended = self.resolve_up_to(generic, GENERIC_COMBO_COUNT, intent).await;
        }

        let suggested = self.suggest(ranked, &recommended, intent).await;
        ComboSelection {
            recommended,
            suggested,
        }
    }

    /// The bundle overlapping most with `ranked`, not already recommended.
    async fn suggest(
        &self,
        ranked: &[RankedProduct],
        recommended: &[ComboResult],
        intent: &Intent,
    ) -> Option<ComboResult> {
        let best = self
            .definitions
            .iter()
            .filter(|d| !recommended.iter().any(|r| r.name == d.name))
            .map(|d| {
                let overlap = ranked.iter().filter(|r| is_member(&r.product, d)).count();
                (overlap, d)
            })
            .filter(|(overlap, _)| *overlap > 0)
            .fold(None, |best: Option<(usize, &ComboDefinition)>, (overlap, d)| match best {
                Some((top, _)) if top >= overlap => best,
                _ => Some((overlap, d)),
            })?;

        self.resolve(best.1, intent).await
    }

    async fn resolve_up_to<'a>(
        &self,
        definitions: impl Iterator<Item = &'a ComboDefinition>,
        limit: usize,
        intent: &Intent,
    ) -> Vec<ComboResult> {
        let mut results = Vec::new();
        for definition in definitions {
            if results.len() >= limit {
                break;
            }
            if let Some(result) = self.resolve(definition, intent).await {
                results.push(result);
            }
        }
        results
    }

    /// Resolve members through search and the profile filter. A member with no
    /// compliant product is skipped; `None` when no member resolves.
    async fn resolve(&self, definition: &ComboDefinition, intent: &Intent) -> Option<ComboResult> {
        let options = SearchOptions::with_limit(MEMBER_SEARCH_LIMIT);
        let mut products: Vec<ProductCandidate> = Vec::new();

        for member in definition.members {
            let found = match self.search.search_by_keyword(member, &options).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(combo = definition.name, member, error = %e, "Bundle member lookup failed");
                    continue;
                }
            };
            if let Some(product) = found.into_iter().find(|p| {
                p.available
                    && passes(p, intent)
                    && !products.iter().any(|q| q.variant_id == p.variant_id)
            }) {
                products.push(product);
            }
        }

        if products.is_empty() {
            debug!(combo = definition.name, "Bundle has no resolvable members");
            return None;
        }

        Some(ComboResult {
            name: definition.name.to_string(),
            description: definition.description.to_string(),
            products,
            benefits: definition.benefits.to_string(),
        })
    }
}
