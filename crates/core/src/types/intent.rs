//! Structured intent derived from a chat turn.

use serde::{Deserialize, Serialize};

use super::goal::GoalKey;
use super::id::CollectionId;
use super::profile::BudgetRange;

/// Hard dietary constraints taken from the profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DietaryFlags {
    pub require_halal: bool,
    pub require_vegan: bool,
    pub require_vegetarian: bool,
    pub avoid_gluten: bool,
    pub avoid_lactose: bool,
}

impl DietaryFlags {
    /// Whether any filter flag is set.
    #[must_use]
    pub const fn any(self) -> bool {
        self.require_halal
            || self.require_vegan
            || self.require_vegetarian
            || self.avoid_gluten
            || self.avoid_lactose
    }
}

/// The gating rule that decided whether product search runs.
///
/// Rules are evaluated in declaration order; the first decisive one wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchGate {
    /// Explicit, non-informational request for a product list.
    ExplicitRequest,
    /// Sale, collection, or combo request.
    ModifierRequest,
    /// Mention of a deficiency.
    Deficiency,
    /// Informational question with no override; search is blocked.
    Informational,
    /// Supplement signals in the message or reply.
    SupplementSignal,
    /// Nothing decisive; search is not attempted.
    #[default]
    NoSignal,
}

impl SearchGate {
    /// Whether this decision allows product search.
    #[must_use]
    pub const fn permits(self) -> bool {
        matches!(
            self,
            Self::ExplicitRequest | Self::ModifierRequest | Self::Deficiency | Self::SupplementSignal
        )
    }
}

/// Everything the classifier derived from one (message, reply, profile) triple.
///
/// Derived purely from its inputs: classifying the same triple twice yields
/// equal values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub primary_goal: Option<GoalKey>,
    /// Ordered and deduplicated; never contains the primary goal.
    pub secondary_goals: Vec<GoalKey>,
    pub budget: Option<BudgetRange>,
    pub dietary: DietaryFlags,
    pub informational_question: bool,
    pub explicit_product_request: bool,
    pub deficiency_intent: bool,
    pub sale_request: bool,
    pub requested_collection: Option<CollectionId>,
    pub combo_request: bool,
    pub supplement_mention: bool,
    /// Canonical nutrient term when one is named (e.g. "magnesium").
    pub specific_supplement: Option<String>,
    pub search_gate: SearchGate,
}

impl Intent {
    /// Primary goal followed by secondary goals.
    pub fn goals(&self) -> impl Iterator<Item = GoalKey> + '_ {
        self.primary_goal
            .into_iter()
            .chain(self.secondary_goals.iter().copied())
    }

    #[must_use]
    pub const fn search_permitted(&self) -> bool {
        self.search_gate.permits()
    }

    /// Whether product and combo output must be withheld from the caller.
    #[must_use]
    pub const fn suppresses_products(&self) -> bool {
        self.informational_question && !self.explicit_product_request
    }

    /// Sale or collection scoping overrides goal-tag search.
    #[must_use]
    pub const fn has_search_modifier(&self) -> bool {
        self.sale_request || self.requested_collection.is_some()
    }
}
