//! Final chat payload.

use chrono::{DateTime, Utc};
use serde::Serialize;
use vitaguide_core::{ComboResult, Intent, ProductCandidate, RankedProduct};

use crate::catalog::ComboSelection;
use crate::providers::ReplySource;

/// Body of a successful `/api/chat` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: String,
    /// Products attached by the completion provider.
    pub products: Vec<ProductCandidate>,
    pub recommended_products: Vec<RankedProduct>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_combos: Option<Vec<ComboResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_combo: Option<ComboResult>,
    pub intent: Intent,
    pub provider: ReplySource,
    pub timestamp: DateTime<Utc>,
}

impl ChatResponse {
    /// Whether any product or bundle is attached.
    #[must_use]
    pub fn has_products(&self) -> bool {
        !self.products.is_empty()
            || !self.recommended_products.is_empty()
            || self.recommended_combos.is_some()
            || self.suggested_combo.is_some()
    }
}

/// Everything the pipeline produced for one turn.
#[derive(Debug, Clone)]
pub struct ResponseParts {
    pub reply: String,
    pub provider_products: Vec<ProductCandidate>,
    pub ranked: Vec<RankedProduct>,
    pub combos: ComboSelection,
    pub intent: Intent,
    pub source: ReplySource,
}

/// Merge pipeline output into the payload.
///
/// Product and combo fields are always emptied for an informational question
/// without an explicit product request, whatever earlier stages computed.
#[must_use]
pub fn assemble(parts: ResponseParts, now: DateTime<Utc>) -> ChatResponse {
    let ResponseParts {
        reply,
        provider_products,
        ranked,
        combos,
        intent,
        source: provider,
    } = parts;

    if intent.suppresses_products() {
        return ChatResponse {
            reply,
            products: Vec::new(),
            recommended_products: Vec::new(),
            recommended_combos: None,
            suggested_combo: None,
            intent,
            provider,
            timestamp: now,
        };
    }

    let recommended_combos = Some(combos.recommended).filter(|c| !c.is_empty());

    ChatResponse {
        reply,
        products: provider_products,
        recommended_products: ranked,
        recommended_combos,
        suggested_combo: combos.suggested,
        intent,
        provider,
        timestamp: now,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rust_decimal::Decimal;
    use vitaguide_core::{CurrencyCode, Price, UsageInstructions, VariantId};

    use super::*;
    use crate::providers::ProviderId;

    fn product(id: &str) -> ProductCandidate {
        ProductCandidate {
            variant_id: VariantId::new(id),
            title: id.to_string(),
            handle: None,
            price: Price::new(Decimal::new(20, 0), CurrencyCode::default()),
            tags: BTreeSet::new(),
            collection_ids: BTreeSet::new(),
            benefits: Vec::new(),
            target_audience: Vec::new(),
            contraindications: Vec::new(),
            usage: UsageInstructions::default(),
            available: true,
            is_on_sale: false,
        }
    }

    fn combo() -> ComboResult {
        ComboResult {
            name: "Sleep & Relaxation Duo".to_string(),
            description: String::new(),
            products: vec![product("mag")],
            benefits: String::new(),
        }
    }

    fn parts(intent: Intent) -> ResponseParts {
        ResponseParts {
            reply: "Here you go".to_string(),
            provider_products: vec![product("p1")],
            ranked: vec![RankedProduct {
                product: product("r1"),
                score: 2.0,
            }],
            combos: ComboSelection {
                recommended: vec![combo()],
                suggested: Some(combo()),
            },
            intent,
            source: ReplySource::Provider(ProviderId::A),
        }
    }

    #[test]
    fn test_informational_question_strips_everything() {
        let intent = Intent {
            informational_question: true,
            ..Intent::default()
        };
        let response = assemble(parts(intent), Utc::now());

        assert!(!response.has_products());
        assert_eq!(response.reply, "Here you go");
        let json = serde_json::to_value(&response).expect("serialize");
        assert!(json.get("recommendedCombos").is_none());
        assert!(json.get("suggestedCombo").is_none());
        assert_eq!(json["products"], serde_json::json!([]));
    }

    #[test]
    fn test_explicit_request_keeps_products() {
        let intent = Intent {
            informational_question: true,
            explicit_product_request: true,
            ..Intent::default()
        };
        let response = assemble(parts(intent), Utc::now());

        assert_eq!(response.products.len(), 1);
        assert_eq!(response.recommended_products.len(), 1);
        assert_eq!(response.recommended_combos.as_ref().map(Vec::len), Some(1));
        assert!(response.suggested_combo.is_some());
    }

    #[test]
    fn test_empty_combo_list_is_omitted() {
        let mut input = parts(Intent::default());
        input.combos = ComboSelection::default();
        let response = assemble(input, Utc::now());
        assert!(response.recommended_combos.is_none());
    }

    #[test]
    fn test_payload_uses_camel_case_and_provider_label() {
        let response = assemble(parts(Intent::default()), Utc::now());
        let json = serde_json::to_value(&response).expect("serialize");

        assert_eq!(json["provider"], "A");
        assert!(json.get("recommendedProducts").is_some());
        assert!(json.get("timestamp").is_some());
        assert!(json["intent"].get("informationalQuestion").is_some());
    }
}
