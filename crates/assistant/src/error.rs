//! Unified error handling with Sentry integration.
//!
//! All route handlers return `Result<T, AppError>`. Server errors are captured
//! to Sentry before responding; clients get a generic message.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

use crate::rate_limit::RateLimitDecision;
use crate::store::StoreError;

/// Application-level error type for the assistant API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Too many requests from one client.
    #[error("Rate limit exceeded")]
    RateLimited {
        limit: u32,
        remaining: u32,
        reset_at: DateTime<Utc>,
        retry_after_secs: u64,
    },

    /// Shared state store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Rejection for a denied rate-limit decision.
    #[must_use]
    pub fn rate_limited(decision: &RateLimitDecision, now: DateTime<Utc>) -> Self {
        Self::RateLimited {
            limit: decision.limit,
            remaining: decision.remaining,
            reset_at: decision.reset_at,
            retry_after_secs: decision.retry_after_secs(now),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Store(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        match self {
            Self::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            Self::RateLimited {
                limit,
                remaining,
                reset_at,
                retry_after_secs,
            } => {
                let mut headers = rate_limit_headers(limit, remaining, reset_at);
                headers.insert(
                    axum::http::header::RETRY_AFTER,
                    HeaderValue::from(retry_after_secs),
                );
                let body = Json(json!({
                    "error": "Too many requests, please try again later.",
                    "retryAfter": retry_after_secs,
                }));
                (StatusCode::TOO_MANY_REQUESTS, headers, body).into_response()
            }
            // Don't expose internal error details to clients
            Self::Store(_) | Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response(),
        }
    }
}

/// `X-RateLimit-*` headers for a chat response.
#[must_use]
pub fn rate_limit_headers(limit: u32, remaining: u32, reset_at: DateTime<Utc>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(reset_at.timestamp()));
    headers
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
