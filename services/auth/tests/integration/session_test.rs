use chrono::{Duration, Utc};
use uuid::Uuid;

use shopdesk_auth::domain::types::{AuthUser, SessionMeta};
use shopdesk_auth::error::AuthServiceError;
use shopdesk_auth::usecase::sessions::{
    Actor, AdminRevokeSessionsUseCase, ListSessionsUseCase, LogoutAllUseCase, LogoutInput,
    LogoutUseCase, RevokeOtherSessionsUseCase, RevokeSessionUseCase,
};
use shopdesk_domain::user::UserRole;

use crate::helpers::*;

#[tokio::test]
async fn should_keep_five_newest_sessions() {
    let sessions = MockSessionRepo::empty();
    let reg = registry(&sessions);
    let user_id = Uuid::new_v4();

    let mut created = vec![];
    for i in 0..7 {
        let s = reg
            .create_session(user_id, None, &format!("refresh-{i}"), &meta("Mozilla/5.0 (iPhone)"))
            .await
            .unwrap();
        created.push(s.id);
    }

    let active: Vec<Uuid> = sessions.active_for(user_id).iter().map(|s| s.id).collect();
    assert_eq!(active.len(), 5);
    assert_eq!(active, created[2..].to_vec());
}

#[tokio::test]
async fn should_not_count_other_users_toward_cap() {
    let sessions = MockSessionRepo::empty();
    let reg = registry(&sessions);
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    for i in 0..5 {
        reg.create_session(alice, None, &format!("a-{i}"), &SessionMeta::default())
            .await
            .unwrap();
    }
    reg.create_session(bob, None, "b-0", &SessionMeta::default())
        .await
        .unwrap();

    assert_eq!(sessions.active_for(alice).len(), 5);
    assert_eq!(sessions.active_for(bob).len(), 1);
}

#[tokio::test]
async fn should_validate_only_matching_active_token() {
    let sessions = MockSessionRepo::empty();
    let reg = registry(&sessions);
    let user_id = Uuid::new_v4();
    let s = reg
        .create_session(user_id, None, "refresh-a", &SessionMeta::default())
        .await
        .unwrap();

    assert_eq!(
        reg.validate_refresh_token(user_id, "refresh-a").await.unwrap().map(|s| s.id),
        Some(s.id)
    );
    assert!(reg.validate_refresh_token(user_id, "refresh-b").await.unwrap().is_none());
    assert!(reg.validate_refresh_token(Uuid::new_v4(), "refresh-a").await.unwrap().is_none());
}

#[tokio::test]
async fn should_deactivate_expired_session_on_validate() {
    let sessions = MockSessionRepo::empty();
    let reg = registry(&sessions);
    let user_id = Uuid::new_v4();
    let s = reg
        .create_session(user_id, None, "refresh-a", &SessionMeta::default())
        .await
        .unwrap();
    {
        let handle = sessions.sessions_handle();
        let mut rows = handle.lock().unwrap();
        rows[0].expires_at = Utc::now() - Duration::seconds(1);
    }

    assert!(reg.validate_refresh_token(user_id, "refresh-a").await.unwrap().is_none());
    let rows = sessions.sessions_handle();
    let row = rows.lock().unwrap().iter().find(|r| r.id == s.id).cloned().unwrap();
    assert!(!row.is_active);
}

#[tokio::test]
async fn should_sweep_expired_sessions() {
    let sessions = MockSessionRepo::empty();
    let reg = registry(&sessions);
    let user_id = Uuid::new_v4();
    for i in 0..3 {
        reg.create_session(user_id, None, &format!("r-{i}"), &SessionMeta::default())
            .await
            .unwrap();
    }
    {
        let handle = sessions.sessions_handle();
        let mut rows = handle.lock().unwrap();
        rows[0].expires_at = Utc::now() - Duration::minutes(5);
        rows[1].expires_at = Utc::now() - Duration::minutes(1);
    }

    assert_eq!(reg.cleanup_expired_sessions().await.unwrap(), 2);
    assert_eq!(reg.cleanup_expired_sessions().await.unwrap(), 0);
    assert_eq!(sessions.active_for(user_id).len(), 1);
}

#[tokio::test]
async fn should_list_sessions_most_recent_first() {
    let sessions = MockSessionRepo::empty();
    let reg = registry(&sessions);
    let user_id = Uuid::new_v4();
    let first = reg
        .create_session(user_id, None, "r-0", &meta("PostmanRuntime/7.36.0"))
        .await
        .unwrap();
    let second = reg
        .create_session(user_id, None, "r-1", &meta("Mozilla/5.0 (Macintosh)"))
        .await
        .unwrap();
    {
        let handle = sessions.sessions_handle();
        let mut rows = handle.lock().unwrap();
        rows[0].last_activity = Utc::now() + Duration::seconds(5);
    }

    let listed = ListSessionsUseCase { registry: reg }
        .execute(user_id)
        .await
        .unwrap();
    assert_eq!(listed.iter().map(|s| s.id).collect::<Vec<_>>(), vec![first.id, second.id]);
    assert_eq!(listed[0].device_info, "Postman");
    assert_eq!(listed[1].device_info, "Mac");
}

#[tokio::test]
async fn should_revoke_only_own_session() {
    let sessions = MockSessionRepo::empty();
    let reg = registry(&sessions);
    let (owner, stranger) = (Uuid::new_v4(), Uuid::new_v4());
    let s = reg
        .create_session(owner, None, "r-0", &SessionMeta::default())
        .await
        .unwrap();
    let uc = RevokeSessionUseCase { registry: reg };

    let err = uc.execute(stranger, s.id).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::SessionNotFound));

    uc.execute(owner, s.id).await.unwrap();
    let err = uc.execute(owner, s.id).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::SessionNotFound));
}

#[tokio::test]
async fn should_revoke_others_but_keep_current() {
    let sessions = MockSessionRepo::empty();
    let reg = registry(&sessions);
    let user_id = Uuid::new_v4();
    let mut ids = vec![];
    for i in 0..4 {
        ids.push(
            reg.create_session(user_id, None, &format!("r-{i}"), &SessionMeta::default())
                .await
                .unwrap()
                .id,
        );
    }

    let revoked = RevokeOtherSessionsUseCase { registry: reg }
        .execute(user_id, ids[2])
        .await
        .unwrap();
    assert_eq!(revoked, 3);
    let active = sessions.active_for(user_id);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, ids[2]);
}

#[tokio::test]
async fn should_logout_by_session_id_or_refresh_token() {
    let sessions = MockSessionRepo::empty();
    let reg = registry(&sessions);
    let user_id = Uuid::new_v4();
    let a = reg
        .create_session(user_id, None, "r-a", &SessionMeta::default())
        .await
        .unwrap();
    reg.create_session(user_id, None, "r-b", &SessionMeta::default())
        .await
        .unwrap();
    let uc = LogoutUseCase { registry: reg };

    uc.execute(LogoutInput {
        user_id,
        session_id: Some(a.id),
        refresh_token: None,
    })
    .await
    .unwrap();
    assert_eq!(sessions.active_for(user_id).len(), 1);

    uc.execute(LogoutInput {
        user_id,
        session_id: None,
        refresh_token: Some("r-b".to_owned()),
    })
    .await
    .unwrap();
    assert!(sessions.active_for(user_id).is_empty());

    // Nothing to identify a session: acknowledged without effect.
    uc.execute(LogoutInput {
        user_id,
        session_id: None,
        refresh_token: None,
    })
    .await
    .unwrap();

    let err = uc
        .execute(LogoutInput {
            user_id,
            session_id: Some(a.id),
            refresh_token: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthServiceError::SessionNotFound));
}

#[tokio::test]
async fn should_logout_everywhere() {
    let sessions = MockSessionRepo::empty();
    let reg = registry(&sessions);
    let user_id = Uuid::new_v4();
    for i in 0..3 {
        reg.create_session(user_id, None, &format!("r-{i}"), &SessionMeta::default())
            .await
            .unwrap();
    }

    let revoked = LogoutAllUseCase { registry: reg }.execute(user_id).await.unwrap();
    assert_eq!(revoked, 3);
    assert!(sessions.active_for(user_id).is_empty());
}

fn member(role: UserRole, tenant: Uuid) -> AuthUser {
    AuthUser {
        role,
        tenant_id: Some(tenant),
        ..test_user(&format!("{}@shop.test", role.as_str()))
    }
}

fn actor(user: &AuthUser) -> Actor {
    Actor {
        user_id: user.id,
        role: user.role,
        tenant_id: user.tenant_id,
    }
}

#[tokio::test]
async fn should_let_admin_revoke_lower_role_in_same_tenant() {
    let tenant = Uuid::new_v4();
    let admin = member(UserRole::Admin, tenant);
    let cashier = member(UserRole::Cashier, tenant);
    let users = MockUserRepo::new(vec![admin.clone(), cashier.clone()]);
    let sessions = MockSessionRepo::empty();
    let reg = registry(&sessions);
    for i in 0..2 {
        reg.create_session(cashier.id, Some(tenant), &format!("r-{i}"), &SessionMeta::default())
            .await
            .unwrap();
    }

    let revoked = AdminRevokeSessionsUseCase { users, registry: reg }
        .execute(actor(&admin), cashier.id)
        .await
        .unwrap();
    assert_eq!(revoked, 2);
    assert!(sessions.active_for(cashier.id).is_empty());
}

#[tokio::test]
async fn should_forbid_revoking_peer_or_other_tenant() {
    let tenant = Uuid::new_v4();
    let admin = member(UserRole::Admin, tenant);
    let other_admin = member(UserRole::Admin, tenant);
    let outsider = member(UserRole::Staff, Uuid::new_v4());
    let manager = member(UserRole::Manager, tenant);
    let users = MockUserRepo::new(vec![
        admin.clone(),
        other_admin.clone(),
        outsider.clone(),
        manager.clone(),
    ]);
    let sessions = MockSessionRepo::empty();
    let uc = AdminRevokeSessionsUseCase {
        users,
        registry: registry(&sessions),
    };

    for (who, target) in [
        (&admin, other_admin.id),
        (&admin, outsider.id),
        (&manager, outsider.id),
    ] {
        let err = uc.execute(actor(who), target).await.unwrap_err();
        assert!(matches!(err, AuthServiceError::Forbidden));
    }

    let err = uc.execute(actor(&admin), Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::UserNotFound));
}

#[tokio::test]
async fn should_let_owner_revoke_another_owner() {
    let tenant = Uuid::new_v4();
    let owner = member(UserRole::Owner, tenant);
    let co_owner = member(UserRole::Owner, tenant);
    let users = MockUserRepo::new(vec![owner.clone(), co_owner.clone()]);
    let sessions = MockSessionRepo::empty();
    let reg = registry(&sessions);
    reg.create_session(co_owner.id, Some(tenant), "r-0", &SessionMeta::default())
        .await
        .unwrap();

    let revoked = AdminRevokeSessionsUseCase { users, registry: reg }
        .execute(actor(&owner), co_owner.id)
        .await
        .unwrap();
    assert_eq!(revoked, 1);
}
