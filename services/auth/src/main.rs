use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Context;
use chrono::Duration;
use sea_orm::Database;
use tracing::info;
use url::Url;

use shopdesk_auth::config::AuthConfig;
use shopdesk_auth::domain::lockout::LockoutPolicy;
use shopdesk_auth::infra::oauth::{HttpOAuthClient, ProviderCredentials};
use shopdesk_auth::router::build_router;
use shopdesk_auth::state::AppState;
use shopdesk_auth::usecase::token::{TokenIssuer, TokenSecrets};
use shopdesk_auth_types::identity::AccessTokenSecret;
use shopdesk_core::config::Config;
use shopdesk_core::tracing::init_tracing;

/// Periodically deactivate sessions past their expiry.
fn spawn_session_sweep(state: AppState, every_secs: u64) {
    let registry = state.session_registry();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(StdDuration::from_secs(every_secs.max(1)));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match registry.cleanup_expired_sessions().await {
                Ok(0) => {}
                Ok(swept) => info!(swept, "expired sessions deactivated"),
                Err(e) => tracing::warn!(error = ?e, "session sweep failed"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let config = AuthConfig::from_env();

    let secrets = TokenSecrets::resolve(
        config.is_production(),
        config.jwt_access_secret.clone(),
        config.jwt_refresh_secret.clone(),
    )?;
    let frontend_url = Url::parse(&config.frontend_url).context("invalid FRONTEND_URL")?;
    if config.bootstrap_activation_code.trim().is_empty() {
        tracing::warn!("BOOTSTRAP_ACTIVATION_CODE not set, tenant bootstrap is disabled");
    }

    let db = Database::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let redis_cfg = deadpool_redis::Config::from_url(&config.redis_url);
    let redis = redis_cfg
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .context("failed to create Redis pool")?;

    let oauth = HttpOAuthClient::new(
        ProviderCredentials::from_parts(
            config.google_client_id.clone(),
            config.google_client_secret.clone(),
        ),
        ProviderCredentials::from_parts(
            config.github_client_id.clone(),
            config.github_client_secret.clone(),
        ),
    );

    let access_secret = AccessTokenSecret(Arc::from(secrets.access.as_str()));
    let issuer = TokenIssuer::new(
        secrets,
        config.access_token_ttl_secs,
        config.refresh_token_ttl_secs,
    );

    let state = AppState {
        db,
        redis,
        issuer,
        access_secret,
        oauth,
        cookie_domain: config.cookie_domain,
        frontend_url,
        activation_code: config.bootstrap_activation_code,
        max_sessions: config.max_sessions_per_user,
        session_ttl: Duration::seconds(config.session_ttl_secs),
        lockout: LockoutPolicy::new(
            config.lockout_threshold,
            Duration::minutes(config.lockout_minutes),
        ),
        password_reset_ttl: Duration::seconds(config.password_reset_ttl_secs),
        forgot_password_limit: config.forgot_password_limit,
        forgot_password_window_secs: config.forgot_password_window_secs,
    };

    spawn_session_sweep(state.clone(), config.session_sweep_interval_secs);

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.auth_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("auth service listening on {addr}");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;
    Ok(())
}
