use axum::{
    Router,
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use shopdesk_core::health::healthz;
use shopdesk_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    auth::{bootstrap, login, oauth_login, refresh, register},
    health::readyz,
    password::{change_password, forgot_password, reset_password},
    session::{
        admin_revoke_sessions, list_sessions, logout, logout_all, revoke_other_sessions,
        revoke_session,
    },
    token::check_token,
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Sign-in
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/bootstrap", post(bootstrap))
        .route("/auth/oauth/{provider}", post(oauth_login))
        // Token
        .route("/auth/refresh", post(refresh))
        .route("/auth/token", get(check_token))
        // Sessions
        .route("/auth/logout", post(logout))
        .route("/auth/logout-all", post(logout_all))
        .route("/auth/sessions", get(list_sessions))
        .route("/auth/sessions/{session_id}", delete(revoke_session))
        .route("/auth/sessions/revoke-others", post(revoke_other_sessions))
        .route(
            "/auth/users/{user_id}/sessions/revoke",
            post(admin_revoke_sessions),
        )
        // Password
        .route("/auth/password/forgot", post(forgot_password))
        .route("/auth/password/reset", post(reset_password))
        .route("/auth/password/change", post(change_password))
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer()),
        )
        .with_state(state)
}
