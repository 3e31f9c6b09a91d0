//! Product candidates returned by catalogue search.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::id::VariantId;
use super::price::Price;

/// Tag tokens that negate the rest of the tag.
const NEGATIONS: &[&str] = &["non", "not", "no", "sans", "pas"];

/// How a product should be taken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInstructions {
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub timing: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub tips: Option<String>,
}

impl UsageInstructions {
    /// Whether no usage field is filled in.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        [&self.dosage, &self.timing, &self.duration, &self.tips]
            .iter()
            .all(|field| field.as_deref().is_none_or(|s| s.trim().is_empty()))
    }
}

/// A purchasable product variant with the structured data used for ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCandidate {
    /// Unique key for deduplication.
    pub variant_id: VariantId,
    pub title: String,
    /// Storefront URL handle, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub collection_ids: BTreeSet<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub target_audience: Vec<String>,
    #[serde(default)]
    pub contraindications: Vec<String>,
    #[serde(default)]
    pub usage: UsageInstructions,
    pub available: bool,
    pub is_on_sale: bool,
}

impl ProductCandidate {
    /// Case-insensitive exact tag match.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Whether any tag carries `word` as a whole token, not negated.
    ///
    /// `halal-certified` matches `halal`; `non-halal` and `not halal` do not.
    #[must_use]
    pub fn has_tag_word(&self, word: &str) -> bool {
        let word = word.to_lowercase();
        self.tags.iter().any(|tag| {
            let tag = tag.to_lowercase();
            let tokens: Vec<&str> = tag
                .split(|c: char| !c.is_alphanumeric())
                .filter(|t| !t.is_empty())
                .collect();
            let negated = tokens.iter().any(|t| NEGATIONS.contains(t));
            !negated && tokens.contains(&word.as_str())
        })
    }

    /// Whether the product carries any of the structured fields used by scoring.
    #[must_use]
    pub fn has_structured_signals(&self) -> bool {
        !self.benefits.is_empty()
            || !self.target_audience.is_empty()
            || !self.contraindications.is_empty()
            || !self.usage.is_empty()
    }

    /// Lower-cased title and tags, for keyword matching.
    #[must_use]
    pub fn search_text(&self) -> String {
        let mut text = self.title.to_lowercase();
        for tag in &self.tags {
            text.push(' ');
            text.push_str(&tag.to_lowercase());
        }
        text
    }
}

/// A candidate with its ranking score (may be negative).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedProduct {
    #[serde(flatten)]
    pub product: ProductCandidate,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::types::price::CurrencyCode;

    fn candidate(tags: &[&str]) -> ProductCandidate {
        ProductCandidate {
            variant_id: VariantId::new("v1"),
            title: "Magnesium Bisglycinate".to_string(),
            handle: None,
            price: Price::new(Decimal::new(1990, 2), CurrencyCode::default()),
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

    #[test]
    fn test_tag_matching() {
        let product = candidate(&["Gluten-Free", "sleep"]);
        assert!(product.has_tag("gluten-free"));
        assert!(!product.has_tag("gluten"));
    }

    #[test]
    fn test_tag_word_matches_whole_tokens_only() {
        let product = candidate(&["Halal-Certified", "vegan friendly"]);
        assert!(product.has_tag_word("halal"));
        assert!(product.has_tag_word("vegan"));
        assert!(!product.has_tag_word("veg"));

        let negated = candidate(&["non-vegan", "not-halal", "sans végan"]);
        assert!(!negated.has_tag_word("vegan"));
        assert!(!negated.has_tag_word("halal"));
        assert!(!negated.has_tag_word("végan"));
    }

    #[test]
    fn test_structured_signals() {
        let mut product = candidate(&[]);
        assert!(!product.has_structured_signals());

        product.usage.dosage = Some("  ".to_string());
        assert!(!product.has_structured_signals());

        product.usage.dosage = Some("2 capsules".to_string());
        assert!(product.has_structured_signals());
    }

    #[test]
    fn test_search_text_lowercases() {
        let product = candidate(&["Vegan"]);
        assert_eq!(product.search_text(), "magnesium bisglycinate vegan");
    }
}
