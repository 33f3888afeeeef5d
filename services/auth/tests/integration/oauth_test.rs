use shopdesk_auth::domain::types::{AuthUser, OAuthProfile, SessionMeta};
use shopdesk_auth::error::AuthServiceError;
use shopdesk_auth::usecase::oauth::{OAuthLoginInput, OAuthLoginUseCase};
use shopdesk_domain::user::{UserRole, UserStatus};

use crate::helpers::*;

fn profile(email: &str) -> OAuthProfile {
    OAuthProfile {
        provider: "google".to_owned(),
        provider_id: "g-123".to_owned(),
        email: email.to_owned(),
        first_name: Some("Ada".to_owned()),
        last_name: Some("Vance".to_owned()),
        avatar_url: Some("https://lh3.example/ada.png".to_owned()),
    }
}

fn usecase(
    users: &MockUserRepo,
    sessions: &MockSessionRepo,
    notifier: &MockNotifier,
    provider: MockOAuthProvider,
) -> OAuthLoginUseCase<MockUserRepo, MockSessionRepo, MockNotifier, MockOAuthProvider> {
    OAuthLoginUseCase {
        users: users.clone(),
        registry: registry(sessions),
        issuer: test_issuer(),
        notifier: notifier.clone(),
        providers: provider,
    }
}

fn input(provider: &str) -> OAuthLoginInput {
    OAuthLoginInput {
        provider: provider.to_owned(),
        code: "auth-code".to_owned(),
        redirect_uri: "https://app.shop.test/oauth/callback".to_owned(),
        meta: SessionMeta::default(),
    }
}

#[tokio::test]
async fn should_create_new_user_from_profile() {
    let users = MockUserRepo::empty();
    let sessions = MockSessionRepo::empty();
    let notifier = MockNotifier::new();

    let out = usecase(
        &users,
        &sessions,
        &notifier,
        MockOAuthProvider::returning(profile("Ada@Example.test")),
    )
    .execute(input("google"))
    .await
    .unwrap();

    assert!(out.is_new_user);
    let stored = users.get(out.user.id);
    assert_eq!(stored.email, "ada@example.test");
    assert_eq!(stored.role, UserRole::Staff);
    assert!(stored.password_hash.is_none());
    assert!(stored.email_verified);
    assert_eq!(stored.oauth_provider.as_deref(), Some("google"));
    assert!(stored.last_login_at.is_some());
    assert_eq!(notifier.sent()[0].kind, "oauth_welcome");
    assert_eq!(notifier.sent()[0].detail.as_deref(), Some("google"));
}

#[tokio::test]
async fn should_link_existing_account_by_email() {
    let existing = user_with_password("ada@example.test").await;
    let users = MockUserRepo::new(vec![existing.clone()]);
    let sessions = MockSessionRepo::empty();
    let notifier = MockNotifier::new();

    let out = usecase(
        &users,
        &sessions,
        &notifier,
        MockOAuthProvider::returning(profile("ada@example.test")),
    )
    .execute(input("google"))
    .await
    .unwrap();

    assert_eq!(out.user.id, existing.id);
    assert!(!out.is_new_user);
    let stored = users.get(existing.id);
    assert_eq!(stored.oauth_provider_id.as_deref(), Some("g-123"));
    assert_eq!(stored.avatar_url.as_deref(), Some("https://lh3.example/ada.png"));
    assert!(stored.password_hash.is_some());
    assert_eq!(users.users.lock().unwrap().len(), 1);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn should_prefer_existing_provider_link() {
    let linked = AuthUser {
        oauth_provider: Some("google".to_owned()),
        oauth_provider_id: Some("g-123".to_owned()),
        ..test_user("old-address@example.test")
    };
    let users = MockUserRepo::new(vec![linked.clone()]);
    let sessions = MockSessionRepo::empty();
    let notifier = MockNotifier::new();

    let out = usecase(
        &users,
        &sessions,
        &notifier,
        MockOAuthProvider::returning(profile("new-address@example.test")),
    )
    .execute(input("google"))
    .await
    .unwrap();

    assert_eq!(out.user.id, linked.id);
    assert_eq!(sessions.active_for(linked.id).len(), 1);
}

#[tokio::test]
async fn should_report_first_login_for_never_logged_in_account() {
    let fresh = AuthUser {
        last_login_at: None,
        ..test_user("ada@example.test")
    };
    let users = MockUserRepo::new(vec![fresh.clone()]);
    let sessions = MockSessionRepo::empty();

    let out = usecase(
        &users,
        &sessions,
        &MockNotifier::new(),
        MockOAuthProvider::returning(profile("ada@example.test")),
    )
    .execute(input("google"))
    .await
    .unwrap();
    assert!(out.is_new_user);
    assert!(users.get(fresh.id).last_login_at.is_some());
}

#[tokio::test]
async fn should_reject_inactive_account() {
    let disabled = AuthUser {
        status: UserStatus::Inactive,
        ..test_user("ada@example.test")
    };
    let users = MockUserRepo::new(vec![disabled.clone()]);
    let sessions = MockSessionRepo::empty();

    let err = usecase(
        &users,
        &sessions,
        &MockNotifier::new(),
        MockOAuthProvider::returning(profile("ada@example.test")),
    )
    .execute(input("google"))
    .await
    .unwrap_err();
    assert!(matches!(err, AuthServiceError::AccountDisabled));
    assert!(sessions.active_for(disabled.id).is_empty());
}

#[tokio::test]
async fn should_reject_incomplete_profile() {
    let users = MockUserRepo::empty();
    let sessions = MockSessionRepo::empty();

    let err = usecase(
        &users,
        &sessions,
        &MockNotifier::new(),
        MockOAuthProvider::returning(profile("  ")),
    )
    .execute(input("google"))
    .await
    .unwrap_err();
    assert!(matches!(err, AuthServiceError::OAuthProfileIncomplete));
}

#[tokio::test]
async fn should_surface_provider_errors() {
    let users = MockUserRepo::empty();
    let sessions = MockSessionRepo::empty();

    let err = usecase(
        &users,
        &sessions,
        &MockNotifier::new(),
        MockOAuthProvider::rejecting(),
    )
    .execute(input("google"))
    .await
    .unwrap_err();
    assert!(matches!(err, AuthServiceError::InvalidCredentials));

    let err = usecase(
        &users,
        &sessions,
        &MockNotifier::new(),
        MockOAuthProvider::returning(profile("ada@example.test")),
    )
    .execute(input("gitlab"))
    .await
    .unwrap_err();
    assert!(matches!(err, AuthServiceError::UnsupportedProvider));
}
