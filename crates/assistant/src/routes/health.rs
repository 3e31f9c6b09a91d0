//! Health endpoints.

use axum::{Json, extract::State, http::StatusCode};

use crate::providers::ProviderStatus;
use crate::state::AppState;

/// Liveness. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness: the profile database answers, when one is configured.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        return StatusCode::OK;
    };
    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Circuit state for each completion provider.
pub async fn providers(State(state): State<AppState>) -> Json<Vec<ProviderStatus>> {
    Json(state.assistant().tracker().status().await)
}
