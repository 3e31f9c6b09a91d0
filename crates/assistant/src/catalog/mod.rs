//! Product catalogue access, staged search, ranking and bundles.
//!
//! # Architecture
//!
//! - [`ProductSearch`] is the search primitive; [`ShopifyCatalog`] implements
//!   it against the Storefront API with a `moka` cache (5 minute TTL)
//! - [`SearchOrchestrator`] runs the staged lookup driven by an intent
//! - [`ranking`] filters by diet and budget, then scores by profile fit
//! - [`ComboMatcher`] resolves predefined bundles

pub mod combos;
pub mod ranking;
pub mod search;
mod shopify;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vitaguide_core::{CollectionId, ProductCandidate};

pub use combos::{ComboMatcher, ComboSelection};
pub use ranking::{ScoringWeights, WeightsError};
pub use search::SearchOrchestrator;
pub use shopify::ShopifyCatalog;

/// Errors that can occur when querying the catalogue.
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by the catalogue.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Modifiers for a keyword search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub only_on_sale: bool,
    pub collection: Option<CollectionId>,
    pub limit: usize,
}

impl SearchOptions {
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}

/// One row of the collection name table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub id: CollectionId,
    pub handle: String,
    pub title: String,
}

/// The raw product search primitive.
#[async_trait]
pub trait ProductSearch: Send + Sync {
    /// Products matching a free-text query. An empty query matches everything
    /// the options allow.
    async fn search_by_keyword(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<ProductCandidate>, SearchError>;

    /// Products carrying any of `tags`.
    async fn search_by_tags(
        &self,
        tags: &[&str],
        limit: usize,
    ) -> Result<Vec<ProductCandidate>, SearchError>;

    /// The live collection table.
    async fn collections(&self) -> Result<Vec<CollectionEntry>, SearchError>;
}
