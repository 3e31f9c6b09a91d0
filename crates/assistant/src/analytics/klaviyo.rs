//! Klaviyo events API sink.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::instrument;

use crate::config::KlaviyoConfig;

use super::{AnalyticsError, AnalyticsSink};

/// Klaviyo API version.
const API_REVISION: &str = "2024-10-15";

/// Klaviyo API base URL.
const BASE_URL: &str = "https://a.klaviyo.com/api";

/// Profile used for events that carry no user id.
const ANONYMOUS_PROFILE: &str = "anonymous";

/// Sends analytics events as Klaviyo metrics.
#[derive(Clone)]
pub struct KlaviyoSink {
    client: reqwest::Client,
}

impl KlaviyoSink {
    /// Create a new Klaviyo sink.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP client fails to build.
    pub fn new(config: &KlaviyoConfig) -> Result<Self, AnalyticsError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Klaviyo-API-Key {}", config.private_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| AnalyticsError::Config(format!("Invalid API key format: {e}")))?,
        );
        headers.insert("revision", HeaderValue::from_static(API_REVISION));
        headers.insert(
            "Content-Type",
            HeaderValue::from_static("application/vnd.api+json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }
}

/// Build the JSON:API body for one event.
fn event_body(event: &str, properties: Value) -> Value {
    let external_id = properties
        .get("userId")
        .and_then(Value::as_str)
        .unwrap_or(ANONYMOUS_PROFILE)
        .to_string();

    json!({
        "data": {
            "type": "event",
            "attributes": {
                "properties": properties,
                "metric": {
                    "data": {
                        "type": "metric",
                        "attributes": { "name": event }
                    }
                },
                "profile": {
                    "data": {
                        "type": "profile",
                        "attributes": { "external_id": external_id }
                    }
                }
            }
        }
    })
}

#[async_trait]
impl AnalyticsSink for KlaviyoSink {
    #[instrument(skip(self, properties))]
    async fn record(&self, event: &str, properties: Value) -> Result<(), AnalyticsError> {
        let response = self
            .client
            .post(format!("{BASE_URL}/events"))
            .json(&event_body(event, properties))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AnalyticsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}
