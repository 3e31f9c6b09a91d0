//! Chat endpoint.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{instrument, warn};

use crate::error::{AppError, Result, rate_limit_headers};
use crate::middleware::client_identifier;
use crate::services::ChatRequest;
use crate::state::AppState;

/// Answer one chat turn.
///
/// POST /api/chat
///
/// Clients are limited by `userId` when the body carries one, otherwise by
/// address. The limit is checked before the body is validated, so malformed
/// requests count too. A deferred health pass, when the turn asked for one, is
/// spawned as the response is returned and never delays it.
///
/// # Errors
///
/// Returns `AppError::RateLimited` when the client is over its window and
/// `AppError::BadRequest` for malformed JSON or a blank message.
#[instrument(skip_all, fields(client = tracing::field::Empty))]
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response> {
    let now = Utc::now();
    let client = payload
        .as_ref()
        .ok()
        .and_then(|Json(request)| request.user_id.as_ref())
        .map_or_else(
            || client_identifier(&headers),
            |user_id| format!("user:{}", user_id.as_str()),
        );
    tracing::Span::current().record("client", client.as_str());

    let decision = state.rate_limiter().check_at(&client, now).await;
    if !decision.allowed {
        warn!(limit = decision.limit, "Rate limit exceeded");
        return Err(AppError::rate_limited(&decision, now));
    }

    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    if request.message.trim().is_empty() {
        return Err(AppError::BadRequest("message is required".to_string()));
    }

    let outcome = state.assistant().handle(&request).await;
    if let Some(job) = outcome.health_check {
        job.spawn();
    }

    let headers = rate_limit_headers(decision.limit, decision.remaining, decision.reset_at);
    Ok((headers, Json(outcome.response)).into_response())
}
