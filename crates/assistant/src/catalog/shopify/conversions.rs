//! Storefront response shapes and their conversion to domain types.

use rust_decimal::Decimal;
use serde::Deserialize;
use vitaguide_core::{
    CollectionId, CurrencyCode, Price, ProductCandidate, UsageInstructions, VariantId,
};

use crate::catalog::CollectionEntry;

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

impl<T> Connection<T> {
    pub fn into_nodes(self) -> impl Iterator<Item = T> {
        self.edges.into_iter().map(|edge| edge.node)
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductsData {
    pub products: Connection<ProductNode>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionProductsData {
    pub collection: Option<CollectionProducts>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionProducts {
    pub products: Connection<ProductNode>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionsData {
    pub collections: Connection<CollectionNode>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionNode {
    pub id: String,
    pub handle: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductNode {
    pub title: String,
    pub handle: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub available_for_sale: bool,
    pub collections: Option<Connection<CollectionRef>>,
    pub variants: Connection<VariantNode>,
    /// Missing metafields come back as `null` entries.
    #[serde(default)]
    pub metafields: Vec<Option<Metafield>>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantNode {
    pub id: String,
    pub available_for_sale: bool,
    pub price: Money,
    pub compare_at_price: Option<Money>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub amount: Decimal,
    pub currency_code: String,
}

#[derive(Debug, Deserialize)]
pub struct Metafield {
    pub key: String,
    pub value: String,
}

/// Convert a product node, using its first variant.
///
/// Returns `None` for products without variants or with an unknown currency.
pub fn convert_product(node: ProductNode) -> Option<ProductCandidate> {
    let variant = node.variants.into_nodes().next()?;
    let currency_code = CurrencyCode::parse(&variant.price.currency_code).ok()?;
    let is_on_sale = variant
        .compare_at_price
        .as_ref()
        .is_some_and(|compare| compare.amount > variant.price.amount);

    let metafield = |key: &str| {
        node.metafields
            .iter()
            .flatten()
            .find(|m| m.key == key)
            .map(|m| m.value.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let usage = UsageInstructions {
        dosage: metafield("dosage"),
        timing: metafield("timing"),
        duration: metafield("duration"),
        tips: metafield("tips"),
    };
    let benefits = metafield("benefits").map(|v| parse_list(&v)).unwrap_or_default();
    let target_audience = metafield("target_audience")
        .map(|v| parse_list(&v))
        .unwrap_or_default();
    let contraindications = metafield("contraindications")
        .map(|v| parse_list(&v))
        .unwrap_or_default();

    Some(ProductCandidate {
        variant_id: VariantId::new(variant.id),
        title: node.title,
        handle: node.handle,
        price: Price::new(variant.price.amount, currency_code),
        tags: node.tags.into_iter().collect(),
        collection_ids: node
            .collections
            .map(|c| c.into_nodes().map(|r| r.id).collect())
            .unwrap_or_default(),
        benefits,
        target_audience,
        contraindications,
        usage,
        available: node.available_for_sale && variant.available_for_sale,
        is_on_sale,
    })
}

pub fn convert_collection(node: CollectionNode) -> CollectionEntry {
    CollectionEntry {
        id: CollectionId::new(node.id),
        handle: node.handle,
        title: node.title,
    }
}

/// List metafields are JSON arrays; older entries are newline separated text.
fn parse_list(value: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(value).unwrap_or_else(|_| {
        value
            .lines()
            .map(|line| line.trim().trim_start_matches(['-', '•']).trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn node() -> ProductNode {
        serde_json::from_value(json!({
            "id": "gid://shopify/Product/1",
            "title": "Magnésium Marin",
            "handle": "magnesium-marin",
            "tags": ["sleep", "vegan"],
            "availableForSale": true,
            "collections": { "edges": [ { "node": { "id": "gid://shopify/Collection/9", "handle": "sommeil" } } ] },
            "variants": { "edges": [ { "node": {
                "id": "gid://shopify/ProductVariant/11",
                "availableForSale": true,
                "price": { "amount": "19.90", "currencyCode": "EUR" },
                "compareAtPrice": { "amount": "24.90", "currencyCode": "EUR" }
            } } ] },
            "metafields": [
                { "key": "benefits", "value": "[\"Supports restful sleep\",\"Reduces fatigue\"]" },
                { "key": "dosage", "value": "2 capsules" },
                { "key": "contraindications", "value": "- Kidney disease\n- Pregnancy" },
                null
            ]
        }))
        .expect("fixture")
    }

    #[test]
    fn test_convert_product_reads_metafields() {
        let product = convert_product(node()).expect("converted");
        assert_eq!(product.variant_id.as_str(), "gid://shopify/ProductVariant/11");
        assert_eq!(product.price.amount, Decimal::new(1990, 2));
        assert!(product.is_on_sale);
        assert!(product.available);
        assert_eq!(product.benefits.len(), 2);
        assert_eq!(product.contraindications, vec!["Kidney disease", "Pregnancy"]);
        assert_eq!(product.usage.dosage.as_deref(), Some("2 capsules"));
        assert!(product.usage.timing.is_none());
        assert!(product.collection_ids.contains("gid://shopify/Collection/9"));
    }

    #[test]
    fn test_product_without_variant_is_skipped() {
        let mut n = node();
        n.variants.edges.clear();
        assert!(convert_product(n).is_none());
    }
}
