//! Provider B: `OpenAI` Chat Completions API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::config::OpenAiConfig;

use super::prompt::render_system_prompt;
use super::{
    Completion, CompletionProvider, CompletionRequest, ProviderError, ProviderId,
    parse_retry_after,
};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_MODELS_URL: &str = "https://api.openai.com/v1/models";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error codes `OpenAI` uses for rate limits and exhausted credit.
const QUOTA_ERROR_CODES: &[&str] = &["insufficient_quota", "rate_limit_exceeded"];

/// `OpenAI` completion provider.
#[derive(Clone)]
pub struct OpenAiProvider {
    inner: Arc<OpenAiProviderInner>,
}

struct OpenAiProviderInner {
    client: reqwest::Client,
    model: String,
}

impl OpenAiProvider {
    /// Create a new `OpenAI` provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn new(config: &OpenAiConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
                .map_err(|e| Self::failure(format!("invalid API key header: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Self::failure(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(OpenAiProviderInner {
                client,
                model: config.model.clone(),
            }),
        })
    }

    fn failure(message: impl Into<String>) -> ProviderError {
        ProviderError::Failure {
            provider: ProviderId::B,
            message: message.into(),
        }
    }

    /// Map a non-success response to a provider error.
    fn error_for(
        status: reqwest::StatusCode,
        retry_after: Option<Duration>,
        body: &str,
    ) -> ProviderError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return ProviderError::Quota {
                provider: ProviderId::B,
                retry_after,
            };
        }

        match serde_json::from_str::<ApiErrorResponse>(body) {
            Ok(api_error) => {
                let code = api_error.error.code.as_deref().unwrap_or_default();
                let error_type = api_error.error.error_type.as_deref().unwrap_or_default();
                if QUOTA_ERROR_CODES.contains(&code) || QUOTA_ERROR_CODES.contains(&error_type) {
                    ProviderError::Quota {
                        provider: ProviderId::B,
                        retry_after,
                    }
                } else {
                    Self::failure(format!("API error ({status}): {}", api_error.error.message))
                }
            }
            Err(_) => Self::failure(format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::B
    }

    #[instrument(skip(self, request), fields(model = %self.inner.model))]
    async fn generate(&self, request: &CompletionRequest<'_>) -> Result<Completion, ProviderError> {
        let system = render_system_prompt(request.language, request.profile_context)
            .map_err(|e| Self::failure(format!("prompt render failed: {e}")))?;

        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: system,
        });
        messages.extend(request.history.iter().map(|turn| ChatMessage {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }));
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.message.to_string(),
        });

        let body = ChatCompletionRequest {
            model: self.inner.model.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            messages,
            user: request.user_id.map(ToString::to_string),
        };

        let response = self
            .inner
            .client
            .post(OPENAI_CHAT_URL)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::failure(format!("HTTP error: {e}")))?;

        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let text = response
            .text()
            .await
            .map_err(|e| Self::failure(format!("failed to read body: {e}")))?;

        if !status.is_success() {
            return Err(Self::error_for(status, retry_after, &text));
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| Self::failure(format!("parse error: {e}")))?;

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if reply.trim().is_empty() {
            return Err(ProviderError::EmptyReply(ProviderId::B));
        }

        Ok(Completion {
            reply,
            products: Vec::new(),
        })
    }

    #[instrument(skip(self))]
    async fn probe_health(&self) -> bool {
        match self.inner.client.get(OPENAI_MODELS_URL).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(status = %response.status(), "OpenAI health probe rejected");
                false
            }
            Err(e) => {
                warn!(error = %e, "OpenAI health probe failed");
                false
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
}
