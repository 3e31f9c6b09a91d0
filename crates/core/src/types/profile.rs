//! Stored user profile.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::conversation::Language;
use super::id::UserId;
use super::price::{CurrencyCode, Price};

/// Age from which a user is treated as a senior for contraindication checks.
pub const SENIOR_AGE: u8 = 65;

/// Age below which a user is treated as a minor.
pub const ADULT_AGE: u8 = 18;

/// Self-reported gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
    Other,
}

impl Gender {
    /// Parse the loose labels users type into profile forms.
    #[must_use]
    pub fn parse_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "female" | "f" | "woman" | "femme" | "féminin" | "feminin" => Some(Self::Female),
            "male" | "m" | "man" | "homme" | "masculin" => Some(Self::Male),
            "" => None,
            _ => Some(Self::Other),
        }
    }

    /// Storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Female => "female",
            Self::Male => "male",
            Self::Other => "other",
        }
    }
}

/// An inclusive price range in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRange {
    pub min: Decimal,
    pub max: Decimal,
    pub currency: CurrencyCode,
}

impl BudgetRange {
    /// Whether a price lies outside this range.
    ///
    /// Prices in another currency are never considered outside: there is no
    /// conversion, so the budget simply does not apply to them.
    #[must_use]
    pub fn excludes(&self, price: &Price) -> bool {
        price.is_in(&self.currency) && (price.amount < self.min || price.amount > self.max)
    }

    /// Centre of the range.
    #[must_use]
    pub fn midpoint(&self) -> Decimal {
        (self.min + self.max) / Decimal::TWO
    }
}

/// A user's stored health profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: UserId,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub gender: Option<Gender>,
    /// Free-text goals as entered (normalized by the classifier).
    #[serde(default)]
    pub goals: Vec<String>,
    /// Allergies and intolerances (e.g. "nuts", "gluten").
    #[serde(default)]
    pub allergies: Vec<String>,
    /// Lifestyle or religious restrictions (e.g. "vegan", "halal").
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub budget: Option<BudgetRange>,
    #[serde(default)]
    pub language: Option<Language>,
}

impl Profile {
    /// An empty profile for a user who has not filled anything in.
    #[must_use]
    pub const fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            age: None,
            gender: None,
            goals: Vec::new(),
            allergies: Vec::new(),
            dietary_restrictions: Vec::new(),
            budget: None,
            language: None,
        }
    }

    #[must_use]
    pub fn is_minor(&self) -> bool {
        self.age.is_some_and(|age| age < ADULT_AGE)
    }

    #[must_use]
    pub fn is_senior(&self) -> bool {
        self.age.is_some_and(|age| age >= SENIOR_AGE)
    }

    #[must_use]
    pub fn is_female(&self) -> bool {
        self.gender == Some(Gender::Female)
    }

    /// Allergies and restrictions together, lower-cased.
    pub fn restriction_terms(&self) -> impl Iterator<Item = String> + '_ {
        self.allergies
            .iter()
            .chain(self.dietary_restrictions.iter())
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty())
    }
}
