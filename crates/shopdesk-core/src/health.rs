use axum::http::StatusCode;

/// Handler for `GET /healthz`: the process is up and serving.
///
/// Readiness depends on each service's backends, so `/readyz` is defined per service.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}
