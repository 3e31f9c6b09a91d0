//! Canonical goal vocabulary.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string is not a canonical goal label.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown goal: {0}")]
pub struct GoalParseError(pub String);

/// A canonical goal label that free text and stored profile goals normalize into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalKey {
    Energy,
    Sleep,
    Stress,
    Immunity,
    Digestion,
    WeightLoss,
    MuscleGain,
    Fitness,
    Wellness,
    Heart,
}

impl GoalKey {
    /// Every goal, in vocabulary order.
    pub const ALL: [Self; 10] = [
        Self::Energy,
        Self::Sleep,
        Self::Stress,
        Self::Immunity,
        Self::Digestion,
        Self::WeightLoss,
        Self::MuscleGain,
        Self::Fitness,
        Self::Wellness,
        Self::Heart,
    ];

    /// The wire label (kebab-case).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::Sleep => "sleep",
            Self::Stress => "stress",
            Self::Immunity => "immunity",
            Self::Digestion => "digestion",
            Self::WeightLoss => "weight-loss",
            Self::MuscleGain => "muscle-gain",
            Self::Fitness => "fitness",
            Self::Wellness => "wellness",
            Self::Heart => "heart",
        }
    }

    /// Whether this goal is about physical training.
    #[must_use]
    pub const fn is_sport(self) -> bool {
        matches!(self, Self::Fitness | Self::MuscleGain)
    }
}

impl fmt::Display for GoalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalKey {
    type Err = GoalParseError;

    /// Parse a canonical label. Accepts `-`, `_`, or space as the word separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        Self::ALL
            .into_iter()
            .find(|goal| goal.as_str() == normalized)
            .ok_or_else(|| GoalParseError(s.to_string()))
    }
}
