//! Shopify Storefront API catalogue.
//!
//! Hand-written GraphQL documents sent with `reqwest`. Search results and the
//! collection table are cached with `moka` (5-minute TTL).

mod conversions;
mod queries;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument};
use vitaguide_core::{CollectionId, ProductCandidate};

use crate::config::ShopifyConfig;

use super::{CollectionEntry, ProductSearch, SearchError, SearchOptions};
use conversions::{
    CollectionProductsData, CollectionsData, GraphQlResponse, ProductsData, convert_collection,
    convert_product,
};

/// Products fetched from a collection before keyword filtering.
const COLLECTION_PAGE_SIZE: usize = 50;

/// Collections fetched for the name table.
const COLLECTION_TABLE_SIZE: usize = 100;

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Products(Vec<ProductCandidate>),
    Collections(Vec<CollectionEntry>),
}

/// Catalogue backed by the Storefront API.
#[derive(Clone)]
pub struct ShopifyCatalog {
    inner: Arc<ShopifyCatalogInner>,
}

struct ShopifyCatalogInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    cache: Cache<String, CacheValue>,
}

impl ShopifyCatalog {
    #[must_use]
    pub fn new(config: &ShopifyConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let endpoint = format!(
            "https://{}/api/{}/graphql.json",
            config.store, config.api_version
        );

        Self {
            inner: Arc::new(ShopifyCatalogInner {
                client: reqwest::Client::new(),
                endpoint,
                access_token: config.storefront_private_token.expose_secret().to_string(),
                cache,
            }),
        }
    }

    /// Execute a GraphQL document.
    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, SearchError> {
        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            // Private access tokens use a different header than public tokens
            .header(
                "Shopify-Storefront-Private-Token",
                &self.inner.access_token,
            )
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(SearchError::RateLimited(retry_after));
        }

        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify API returned non-success status"
            );
            return Err(SearchError::GraphQl(format!(
                "HTTP {status}: {}",
                response_text.chars().take(200).collect::<String>()
            )));
        }

        let response: GraphQlResponse<T> = serde_json::from_str(&response_text)?;

        if !response.errors.is_empty() {
            let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
            debug!(errors = ?messages, "GraphQL errors in response");
            return Err(SearchError::GraphQl(messages.join("; ")));
        }

        response
            .data
            .ok_or_else(|| SearchError::GraphQl("No data in response".to_string()))
    }

    async fn cached_products(&self, key: &str) -> Option<Vec<ProductCandidate>> {
        match self.inner.cache.get(key).await {
            Some(CacheValue::Products(products)) => {
                debug!(key, "Cache hit for products");
                Some(products)
            }
            _ => None,
        }
    }

    async fn store_products(&self, key: String, products: &[ProductCandidate]) {
        self.inner
            .cache
            .insert(key, CacheValue::Products(products.to_vec()))
            .await;
    }

    async fn search(&self, query: Option<String>, first: usize) -> Result<Vec<ProductCandidate>, SearchError> {
        let data: ProductsData = self
            .execute(
                &queries::search_products(),
                json!({ "query": query, "first": first }),
            )
            .await?;
        Ok(data.products.into_nodes().filter_map(convert_product).collect())
    }

    async fn collection_products(
        &self,
        collection: &CollectionId,
    ) -> Result<Vec<ProductCandidate>, SearchError> {
        // Ids from the static fallback table are handles.
        let (id, handle) = if collection.as_str().starts_with("gid://") {
            (Some(collection.as_str()), None)
        } else {
            (None, Some(collection.as_str()))
        };

        let data: CollectionProductsData = self
            .execute(
                &queries::collection_products(),
                json!({ "id": id, "handle": handle, "first": COLLECTION_PAGE_SIZE }),
            )
            .await?;

        let collection = data
            .collection
            .ok_or_else(|| SearchError::NotFound(format!("Collection not found: {collection}")))?;
        Ok(collection
            .products
            .into_nodes()
            .filter_map(convert_product)
            .collect())
    }
}

#[async_trait]
impl ProductSearch for ShopifyCatalog {
    #[instrument(skip(self), fields(query = %query))]
    async fn search_by_keyword(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<ProductCandidate>, SearchError> {
        let cache_key = format!(
            "keyword:{}:{}:{}",
            query.trim().to_lowercase(),
            options.only_on_sale,
            options.collection.as_ref().map_or("", CollectionId::as_str),
        );

        let products = if let Some(products) = self.cached_products(&cache_key).await {
            products
        } else {
            let products = match &options.collection {
                // Collection listings take no query string, so filter locally.
                Some(collection) => {
                    let needle = query.trim().to_lowercase();
                    self.collection_products(collection)
                        .await?
                        .into_iter()
                        .filter(|p| needle.is_empty() || p.search_text().contains(&needle))
                        .collect()
                }
                None => {
                    self.search(queries::keyword_query(query), COLLECTION_PAGE_SIZE)
                        .await?
                }
            };
            self.store_products(cache_key, &products).await;
            products
        };

        Ok(products
            .into_iter()
            .filter(|p| !options.only_on_sale || p.is_on_sale)
            .take(options.limit)
            .collect())
    }

    #[instrument(skip(self))]
    async fn search_by_tags(
        &self,
        tags: &[&str],
        limit: usize,
    ) -> Result<Vec<ProductCandidate>, SearchError> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        let cache_key = format!("tags:{}:{limit}", tags.join(","));
        if let Some(products) = self.cached_products(&cache_key).await {
            return Ok(products);
        }

        let products = self.search(Some(queries::tag_query(tags)), limit).await?;
        self.store_products(cache_key, &products).await;
        Ok(products)
    }

    #[instrument(skip(self))]
    async fn collections(&self) -> Result<Vec<CollectionEntry>, SearchError> {
        const CACHE_KEY: &str = "collections";

        if let Some(CacheValue::Collections(collections)) = self.inner.cache.get(CACHE_KEY).await {
            debug!("Cache hit for collections");
            return Ok(collections);
        }

        let data: CollectionsData = self
            .execute(queries::COLLECTIONS, json!({ "first": COLLECTION_TABLE_SIZE }))
            .await?;
        let collections: Vec<CollectionEntry> =
            data.collections.into_nodes().map(convert_collection).collect();

        self.inner
            .cache
            .insert(
                CACHE_KEY.to_string(),
                CacheValue::Collections(collections.clone()),
            )
            .await;

        Ok(collections)
    }
}
