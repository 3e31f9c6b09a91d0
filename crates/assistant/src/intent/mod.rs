//! Intent classification.
//!
//! [`classify`] is a pure function of its inputs: the same message, reply,
//! profile and collection table always produce the same [`Intent`].
//!
//! Which signals read which text:
//!
//! | Signal | Message | Reply | Profile |
//! |--------|---------|-------|---------|
//! | informational, explicit request, sale, collection, combo, deficiency | yes | | |
//! | supplement mention, specific supplement | yes | yes | |
//! | goals | yes | | yes |
//! | budget, dietary flags | | | yes |

pub mod collections;
pub mod gate;
pub mod goals;
pub mod patterns;

use vitaguide_core::{DietaryFlags, Intent, Profile};

use crate::catalog::CollectionEntry;

pub use collections::{fallback_collections, requested_collection};
pub use gate::{GATE_RULES, Signals};

/// Classify one exchange.
#[must_use]
pub fn classify(
    message: &str,
    reply: &str,
    profile: Option<&Profile>,
    collections: &[CollectionEntry],
) -> Intent {
    let message = message.to_lowercase();
    let reply = reply.to_lowercase();

    let goals = goals::derive_goals(&message, profile);
    let specific_supplement = patterns::first_nutrient(&message)
        .or_else(|| patterns::first_nutrient(&reply))
        .map(str::to_string);
    let supplement_in_message = patterns::mentions_supplement(&message);
    let supplement_in_reply = patterns::mentions_supplement(&reply);
    let requested_collection = requested_collection(&message, collections);

    let informational = patterns::is_informational(&message);
    let signals = Signals {
        // A request phrased inside a safety or timing question stays a question.
        explicit_request: patterns::is_explicit_request(&message) && !informational,
        informational,
        sale: patterns::is_sale_request(&message),
        collection: requested_collection.is_some(),
        combo: patterns::is_combo_request(&message),
        deficiency: patterns::is_deficiency(&message),
        specific_supplement: specific_supplement.is_some(),
        supplement_in_message,
        supplement_in_reply,
        has_goal: !goals.is_empty(),
    };

    let mut goals = goals.into_iter();
    Intent {
        primary_goal: goals.next(),
        secondary_goals: goals.collect(),
        budget: profile.and_then(|p| p.budget.clone()),
        dietary: dietary_flags(profile),
        informational_question: signals.informational,
        explicit_product_request: signals.explicit_request,
        deficiency_intent: signals.deficiency,
        sale_request: signals.sale,
        requested_collection,
        combo_request: signals.combo,
        supplement_mention: supplement_in_message || supplement_in_reply || signals.specific_supplement,
        specific_supplement,
        search_gate: gate::decide(&signals),
    }
}

/// Dietary flags from the profile's allergies and restrictions.
#[must_use]
pub fn dietary_flags(profile: Option<&Profile>) -> DietaryFlags {
    let mut flags = DietaryFlags::default();
    let Some(profile) = profile else {
        return flags;
    };

    for term in profile.restriction_terms() {
        let has = |words: &[&str]| words.iter().any(|w| term.contains(w));
        flags.require_halal |= has(&["halal"]);
        flags.require_vegan |= has(&["vegan", "végan", "végétalien", "vegetalien"]);
        flags.require_vegetarian |= has(&["vegetarian", "végétarien", "vegetarien"]);
        flags.avoid_gluten |= has(&["gluten", "celiac", "coeliac", "cœliaque", "coeliaque"]);
        flags.avoid_lactose |= has(&["lactose", "dairy", "laitier", "lait"]);
    }
    flags
}
