//! Resolved product bundles.

use serde::{Deserialize, Serialize};

use super::product::ProductCandidate;

/// A bundle whose members were resolved against the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboResult {
    pub name: String,
    pub description: String,
    /// Resolved members; may be empty for a suggestion with nothing in stock.
    pub products: Vec<ProductCandidate>,
    pub benefits: String,
}
