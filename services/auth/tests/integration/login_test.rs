use chrono::{Duration, Utc};

use shopdesk_auth::domain::lockout::LockoutPolicy;
use shopdesk_auth::domain::types::SessionMeta;
use shopdesk_auth::error::AuthServiceError;
use shopdesk_auth::usecase::login::{LoginInput, LoginUseCase};
use shopdesk_auth_types::token::validate_access_token;
use shopdesk_domain::user::UserStatus;

use crate::helpers::*;

fn usecase(users: &MockUserRepo, sessions: &MockSessionRepo) -> LoginUseCase<MockUserRepo, MockSessionRepo> {
    LoginUseCase {
        users: users.clone(),
        registry: registry(sessions),
        issuer: test_issuer(),
        lockout: LockoutPolicy::default(),
    }
}

fn input(email: &str, password: &str) -> LoginInput {
    LoginInput {
        email: email.to_owned(),
        password: password.to_owned(),
        meta: meta("Mozilla/5.0 (Windows NT 10.0; Win64; x64)"),
    }
}

#[tokio::test]
async fn should_login_and_open_session() {
    let user = user_with_password("dana@shop.test").await;
    let users = MockUserRepo::new(vec![user.clone()]);
    let sessions = MockSessionRepo::empty();

    let out = usecase(&users, &sessions)
        .execute(input("  Dana@Shop.test ", TEST_PASSWORD))
        .await
        .unwrap();

    assert_eq!(out.user.id, user.id);
    let info = validate_access_token(&out.issued.tokens.access_token, TEST_ACCESS_SECRET).unwrap();
    assert_eq!(info.user_id.0, user.id);
    assert_eq!(info.role, user.role);

    let active = sessions.active_for(user.id);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, out.issued.session_id);
    assert_eq!(active[0].device_info, "Windows PC");
    assert_ne!(active[0].refresh_token_hash, out.issued.tokens.refresh_token);
}

#[tokio::test]
async fn should_reject_unknown_email_and_wrong_password_identically() {
    let user = user_with_password("dana@shop.test").await;
    let users = MockUserRepo::new(vec![user]);
    let sessions = MockSessionRepo::empty();
    let uc = usecase(&users, &sessions);

    let unknown = uc.execute(input("nobody@shop.test", TEST_PASSWORD)).await.unwrap_err();
    let wrong = uc.execute(input("dana@shop.test", "not-the-password")).await.unwrap_err();

    assert!(matches!(unknown, AuthServiceError::InvalidCredentials));
    assert!(matches!(wrong, AuthServiceError::InvalidCredentials));
    assert_eq!(unknown.to_string(), wrong.to_string());
}

#[tokio::test]
async fn should_require_email_and_password() {
    let users = MockUserRepo::empty();
    let sessions = MockSessionRepo::empty();

    let err = usecase(&users, &sessions)
        .execute(LoginInput {
            email: " ".to_owned(),
            password: String::new(),
            meta: SessionMeta::default(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthServiceError::Validation(_)));
}

#[tokio::test]
async fn should_lock_after_five_failures() {
    let user = user_with_password("dana@shop.test").await;
    let users = MockUserRepo::new(vec![user.clone()]);
    let sessions = MockSessionRepo::empty();
    let uc = usecase(&users, &sessions);

    for _ in 0..5 {
        let err = uc.execute(input("dana@shop.test", "wrong-password")).await.unwrap_err();
        assert!(matches!(err, AuthServiceError::InvalidCredentials));
    }
    let stored = users.get(user.id);
    assert_eq!(stored.failed_login_attempts, 5);
    assert!(stored.locked_until.is_some());

    // Correct password is refused while locked.
    let err = uc.execute(input("dana@shop.test", TEST_PASSWORD)).await.unwrap_err();
    match err {
        AuthServiceError::AccountLocked { remaining_minutes } => {
            assert!((14..=15).contains(&remaining_minutes));
        }
        other => panic!("expected AccountLocked, got {other:?}"),
    }
    assert!(sessions.active_for(user.id).is_empty());
}

#[tokio::test]
async fn should_unlock_lazily_once_lock_expires() {
    let user = user_with_password("dana@shop.test").await;
    let users = MockUserRepo::new(vec![user.clone()]);
    let sessions = MockSessionRepo::empty();
    let uc = usecase(&users, &sessions);

    for _ in 0..5 {
        let _ = uc.execute(input("dana@shop.test", "wrong-password")).await;
    }
    users.update(user.id, |u| u.locked_until = Some(Utc::now() - Duration::seconds(1)));

    let out = uc.execute(input("dana@shop.test", TEST_PASSWORD)).await.unwrap();
    assert_eq!(out.user.failed_login_attempts, 0);

    let stored = users.get(user.id);
    assert_eq!(stored.failed_login_attempts, 0);
    assert!(stored.locked_until.is_none());
}

#[tokio::test]
async fn should_relock_on_first_failure_after_expired_lock() {
    let user = user_with_password("dana@shop.test").await;
    let users = MockUserRepo::new(vec![user.clone()]);
    let sessions = MockSessionRepo::empty();
    let uc = usecase(&users, &sessions);

    for _ in 0..5 {
        let _ = uc.execute(input("dana@shop.test", "wrong-password")).await;
    }
    users.update(user.id, |u| u.locked_until = Some(Utc::now() - Duration::seconds(1)));

    let err = uc.execute(input("dana@shop.test", "still-wrong")).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::InvalidCredentials));
    let stored = users.get(user.id);
    assert_eq!(stored.failed_login_attempts, 6);
    assert!(stored.locked_until.unwrap() > Utc::now());
}

#[tokio::test]
async fn should_reset_counter_on_success_below_threshold() {
    let user = user_with_password("dana@shop.test").await;
    let users = MockUserRepo::new(vec![user.clone()]);
    let sessions = MockSessionRepo::empty();
    let uc = usecase(&users, &sessions);

    for _ in 0..3 {
        let _ = uc.execute(input("dana@shop.test", "wrong-password")).await;
    }
    assert_eq!(users.get(user.id).failed_login_attempts, 3);

    uc.execute(input("dana@shop.test", TEST_PASSWORD)).await.unwrap();
    assert_eq!(users.get(user.id).failed_login_attempts, 0);
}

#[tokio::test]
async fn should_point_oauth_only_account_at_provider() {
    let user = shopdesk_auth::domain::types::AuthUser {
        oauth_provider: Some("google".to_owned()),
        oauth_provider_id: Some("g-1".to_owned()),
        ..test_user("dana@shop.test")
    };
    let users = MockUserRepo::new(vec![user]);
    let sessions = MockSessionRepo::empty();

    let err = usecase(&users, &sessions)
        .execute(input("dana@shop.test", TEST_PASSWORD))
        .await
        .unwrap_err();
    match err {
        AuthServiceError::OAuthOnlyAccount { provider } => assert_eq!(provider, "google"),
        other => panic!("expected OAuthOnlyAccount, got {other:?}"),
    }
}

#[tokio::test]
async fn should_reject_inactive_account_after_password_check() {
    let mut user = user_with_password("dana@shop.test").await;
    user.status = UserStatus::Inactive;
    let users = MockUserRepo::new(vec![user.clone()]);
    let sessions = MockSessionRepo::empty();
    let uc = usecase(&users, &sessions);

    let err = uc.execute(input("dana@shop.test", TEST_PASSWORD)).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::AccountDisabled));

    // A wrong password still reads as bad credentials.
    let err = uc.execute(input("dana@shop.test", "wrong-password")).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::InvalidCredentials));
    assert!(sessions.active_for(user.id).is_empty());
}
