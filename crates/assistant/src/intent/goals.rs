//! Free-text goal derivation.

use std::sync::LazyLock;

use regex::Regex;
use vitaguide_core::{GoalKey, Profile};

static GOAL_PATTERNS: LazyLock<Vec<(GoalKey, Regex)>> = LazyLock::new(|| {
    [
        (
            GoalKey::Energy,
            r"\b(energy|energi[sz]\w*|tired\w*|fatigue\w*|exhaust\w*|vitality|énergie|fatigu\w*|épuis\w*|vitalité|tonus)\b",
        ),
        (
            GoalKey::Sleep,
            r"\b(sleep\w*|insomnia|restful|sommeil|dormir|endormi\w*|insomnies?|nuits?)\b",
        ),
        (
            GoalKey::Stress,
            r"\b(stress\w*|anxi\w*|relax\w*|calm\w*|nervous\w*|anxiété|angoiss\w*|détente|zen)\b",
        ),
        (
            GoalKey::Immunity,
            r"\b(immun\w*|colds?|flu|défenses?|rhumes?|grippe|hiver)\b",
        ),
        (
            GoalKey::Digestion,
            r"\b(digest\w*|bloat\w*|gut|intestin\w*|transit|ballonn\w*|ventre)\b",
        ),
        (
            GoalKey::WeightLoss,
            r"\b(weight[- ]loss|lose weight|losing weight|slimming|fat[- ]burn\w*|minceur|perdre du poids|perte de poids|maigrir|brûle-graisses?)\b",
        ),
        (
            GoalKey::MuscleGain,
            r"\b(muscle gain|build muscle|muscle mass|mass gain|bulk\w*|prise de masse|masse musculaire|musculation)\b",
        ),
        (
            GoalKey::Fitness,
            r"\b(fitness|workouts?|training|exercis\w*|sports?|running|gym|endurance|recovery|entraînement|récupération|course à pied)\b",
        ),
        (
            GoalKey::Wellness,
            r"\b(wellness|well-being|wellbeing|general health|bien-être|santé générale|en forme)\b",
        ),
        (
            GoalKey::Heart,
            r"\b(heart|cardio\w*|cholesterol|blood pressure|cœur|coeur|cholestérol|tension artérielle)\b",
        ),
    ]
    .into_iter()
    .map(|(goal, pattern)| (goal, Regex::new(pattern).expect("Invalid regex")))
    .collect()
});

/// Goals mentioned in lower-cased `text`, ordered by first occurrence.
///
/// Goals matching at the same position keep table order.
#[must_use]
pub fn goals_in(text: &str) -> Vec<GoalKey> {
    let mut found: Vec<(usize, GoalKey)> = GOAL_PATTERNS
        .iter()
        .filter_map(|(goal, re)| re.find(text).map(|m| (m.start(), *goal)))
        .collect();
    found.sort_by_key(|(position, _)| *position);
    found.into_iter().map(|(_, goal)| goal).collect()
}

/// Map one stored goal string onto the vocabulary.
///
/// Exact keys (`weight_loss`, `Muscle Gain`) parse directly; anything else is
/// scanned with the keyword families.
#[must_use]
pub fn goal_from_label(label: &str) -> Option<GoalKey> {
    label
        .parse::<GoalKey>()
        .ok()
        .or_else(|| goals_in(&label.to_lowercase()).into_iter().next())
}

/// Message goals first, then profile goals, without duplicates.
#[must_use]
pub fn derive_goals(message: &str, profile: Option<&Profile>) -> Vec<GoalKey> {
    let from_profile = profile
        .into_iter()
        .flat_map(|p| p.goals.iter())
        .filter_map(|label| goal_from_label(label));

    let mut goals = Vec::new();
    for goal in goals_in(message).into_iter().chain(from_profile) {
        if !goals.contains(&goal) {
            goals.push(goal);
        }
    }
    goals
}
