//! GraphQL documents for the Storefront API.

/// Fields read for every product. Structured data lives in `custom.*`
/// metafields; list fields hold JSON arrays.
const PRODUCT_FIELDS: &str = r#"
fragment ProductFields on Product {
  id
  title
  handle
  tags
  availableForSale
  collections(first: 10) { edges { node { id handle } } }
  variants(first: 1) {
    edges {
      node {
        id
        availableForSale
        price { amount currencyCode }
        compareAtPrice { amount currencyCode }
      }
    }
  }
  metafields(identifiers: [
    { namespace: "custom", key: "benefits" }
    { namespace: "custom", key: "target_audience" }
    { namespace: "custom", key: "contraindications" }
    { namespace: "custom", key: "dosage" }
    { namespace: "custom", key: "timing" }
    { namespace: "custom", key: "duration" }
    { namespace: "custom", key: "tips" }
  ]) { key value }
}
"#;

const SEARCH_PRODUCTS_BODY: &str = r"
query SearchProducts($query: String, $first: Int!) {
  products(first: $first, query: $query) {
    edges { node { ...ProductFields } }
  }
}
";

const COLLECTION_PRODUCTS_BODY: &str = r"
query CollectionProducts($id: ID, $handle: String, $first: Int!) {
  collection(id: $id, handle: $handle) {
    products(first: $first) {
      edges { node { ...ProductFields } }
    }
  }
}
";

/// Collection name table.
pub const COLLECTIONS: &str = r"
query Collections($first: Int!) {
  collections(first: $first) {
    edges { node { id handle title } }
  }
}
";

/// Full product search document.
#[must_use]
pub fn search_products() -> String {
    format!("{SEARCH_PRODUCTS_BODY}{PRODUCT_FIELDS}")
}

/// Products of one collection.
#[must_use]
pub fn collection_products() -> String {
    format!("{COLLECTION_PRODUCTS_BODY}{PRODUCT_FIELDS}")
}

/// Storefront search syntax for a keyword query.
#[must_use]
pub fn keyword_query(keyword: &str) -> Option<String> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return None;
    }
    Some(format!("{} available_for_sale:true", escape(keyword)))
}

/// Storefront search syntax matching any of `tags`.
#[must_use]
pub fn tag_query(tags: &[&str]) -> String {
    let clauses: Vec<String> = tags
        .iter()
        .map(|tag| format!("tag:\"{}\"", escape(tag)))
        .collect();
    format!("({}) available_for_sale:true", clauses.join(" OR "))
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
