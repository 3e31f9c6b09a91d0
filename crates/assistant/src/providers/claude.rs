//! Provider A: Anthropic Messages API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::config::ClaudeConfig;

use super::prompt::render_system_prompt;
use super::{
    Completion, CompletionProvider, CompletionRequest, ProviderError, ProviderId,
    parse_retry_after,
};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error types Anthropic uses for quota and load shedding.
const QUOTA_ERROR_TYPES: &[&str] = &["rate_limit_error", "overloaded_error"];

/// Claude completion provider.
#[derive(Clone)]
pub struct ClaudeProvider {
    inner: Arc<ClaudeProviderInner>,
}

struct ClaudeProviderInner {
    client: reqwest::Client,
    model: String,
    endpoint: String,
}

impl ClaudeProvider {
    /// Create a new Claude provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn new(config: &ClaudeConfig) -> Result<Self, ProviderError> {
        Self::with_endpoint(config, ANTHROPIC_API_URL)
    }

    /// Create a provider that talks to a custom endpoint (proxies, tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn with_endpoint(config: &ClaudeConfig, endpoint: &str) -> Result<Self, ProviderError> {
        let setup_error = |message: String| ProviderError::Failure {
            provider: ProviderId::A,
            message,
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(config.api_key.expose_secret())
                .map_err(|e| setup_error(format!("invalid API key header: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| setup_error(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(ClaudeProviderInner {
                client,
                model: config.model.clone(),
                endpoint: endpoint.to_string(),
            }),
        })
    }

    fn failure(message: impl Into<String>) -> ProviderError {
        ProviderError::Failure {
            provider: ProviderId::A,
            message: message.into(),
        }
    }

    async fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse, ProviderError> {
        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| Self::failure(format!("HTTP error: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::Quota {
                provider: ProviderId::A,
                retry_after: parse_retry_after(response.headers()),
            });
        }

        let retry_after = parse_retry_after(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| Self::failure(format!("failed to read body: {e}")))?;

        if !status.is_success() {
            if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                if QUOTA_ERROR_TYPES.contains(&api_error.error.error_type.as_str()) {
                    return Err(ProviderError::Quota {
                        provider: ProviderId::A,
                        retry_after,
                    });
                }
                return Err(Self::failure(format!(
                    "API error ({}): {}",
                    api_error.error.error_type, api_error.error.message
                )));
            }
            return Err(Self::failure(format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        serde_json::from_str(&body).map_err(|e| Self::failure(format!("parse error: {e}")))
    }
}

#[async_trait]
impl CompletionProvider for ClaudeProvider {
    fn id(&self) -> ProviderId {
        ProviderId::A
    }

    #[instrument(skip(self, request), fields(model = %self.inner.model))]
    async fn generate(&self, request: &CompletionRequest<'_>) -> Result<Completion, ProviderError> {
        let system = render_system_prompt(request.language, request.profile_context)
            .map_err(|e| Self::failure(format!("prompt render failed: {e}")))?;

        let mut messages: Vec<Message> = request
            .history
            .iter()
            .map(|turn| Message {
                role: turn.role.as_str().to_string(),
                content: turn.content.clone(),
            })
            .collect();
        messages.push(Message {
            role: "user".to_string(),
            content: request.message.to_string(),
        });

        let body = MessagesRequest {
            model: self.inner.model.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system: Some(system),
            messages,
            metadata: request.user_id.map(|id| Metadata {
                user_id: id.to_string(),
            }),
        };

        let response = self.send(&body).await?;
        let reply = response.text();
        if reply.trim().is_empty() {
            return Err(ProviderError::EmptyReply(ProviderId::A));
        }

        Ok(Completion {
            reply,
            products: Vec::new(),
        })
    }

    #[instrument(skip(self))]
    async fn probe_health(&self) -> bool {
        let body = MessagesRequest {
            model: self.inner.model.clone(),
            max_tokens: 1,
            system: None,
            messages: vec![Message {
                role: "user".to_string(),
                content: "ping".to_string(),
            }],
            metadata: None,
        };

        match self.send(&body).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Claude health probe failed");
                false
            }
        }
    }
}

/// Request body for the Messages API.
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct Metadata {
    user_id: String,
}

/// Response from the Messages API.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

impl MessagesResponse {
    /// Concatenate every text block.
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// API error response from Claude.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}
