use axum::extract::FromRef;
use chrono::Duration;
use deadpool_redis::Pool as RedisPool;
use sea_orm::DatabaseConnection;
use url::Url;

use shopdesk_auth_types::identity::AccessTokenSecret;

use crate::domain::lockout::LockoutPolicy;
use crate::infra::cache::RedisThrottle;
use crate::infra::db::{DbSessionRepository, DbTenantRepository, DbUserRepository, OutboxNotifier};
use crate::infra::oauth::HttpOAuthClient;
use crate::usecase::session::SessionRegistry;
use crate::usecase::token::TokenIssuer;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub redis: RedisPool,
    pub issuer: TokenIssuer,
    pub access_secret: AccessTokenSecret,
    pub oauth: HttpOAuthClient,
    pub cookie_domain: String,
    pub frontend_url: Url,
    pub activation_code: String,
    pub max_sessions: usize,
    pub session_ttl: Duration,
    pub lockout: LockoutPolicy,
    pub password_reset_ttl: Duration,
    pub forgot_password_limit: u32,
    pub forgot_password_window_secs: u64,
}

impl FromRef<AppState> for AccessTokenSecret {
    fn from_ref(state: &AppState) -> Self {
        state.access_secret.clone()
    }
}

impl AppState {
    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: self.db.clone(),
        }
    }

    pub fn tenant_repo(&self) -> DbTenantRepository {
        DbTenantRepository {
            db: self.db.clone(),
        }
    }

    pub fn session_registry(&self) -> SessionRegistry<DbSessionRepository> {
        SessionRegistry {
            sessions: DbSessionRepository {
                db: self.db.clone(),
            },
            max_sessions: self.max_sessions,
            session_ttl: self.session_ttl,
        }
    }

    pub fn notifier(&self) -> OutboxNotifier {
        OutboxNotifier {
            db: self.db.clone(),
        }
    }

    pub fn throttle(&self) -> RedisThrottle {
        RedisThrottle {
            pool: self.redis.clone(),
        }
    }
}
