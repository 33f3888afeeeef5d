use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// `GET /readyz`: ready once Postgres and Redis both answer.
pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    if let Err(e) = state.db.ping().await {
        tracing::warn!(error = ?e, "readiness: database unreachable");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    if let Err(e) = state.redis.get().await {
        tracing::warn!(error = ?e, "readiness: redis unreachable");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}
