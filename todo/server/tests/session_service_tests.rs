use chrono::Duration;
use sea_orm::{ActiveModelTrait, ActiveValue, EntityTrait, PaginatorTrait};
use todo_server::auth::session::{SessionService, SessionServiceError};
use todo_server::entities::{session, users};
use todo_server::user::UserService;

mod common;

async fn insert_expired_session(db: &sea_orm::DatabaseConnection, token: &str, user_id: u32) {
    session::ActiveModel {
        id: ActiveValue::Set(token.to_string()),
        user_id: ActiveValue::Set(user_id as i32),
        expires_at: ActiveValue::Set((chrono::Utc::now() - Duration::hours(1)).timestamp()),
    }
    .insert(db)
    .await
    .unwrap();
}

#[tokio::test]
async fn session_resolves_to_its_user() {
    let db = common::setup_db().await.unwrap();
    let ada = UserService::new(&db)
        .create_user("a@x.io".to_string(), "Ada".to_string(), "pw")
        .await
        .unwrap();
    let session_service = SessionService::new(&db);

    let session = session_service
        .create_session(ada.id(), Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(session.user_id(), ada.id());
    assert!(session.expires_at() > chrono::Utc::now());
    let resolved = session_service
        .resolve_user(session.token())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.id(), ada.id());
    assert_eq!(resolved.name(), "Ada");
}

#[tokio::test]
async fn tokens_are_unique_per_session() {
    let db = common::setup_db().await.unwrap();
    let ada = UserService::new(&db)
        .create_user("a@x.io".to_string(), "Ada".to_string(), "pw")
        .await
        .unwrap();
    let session_service = SessionService::new(&db);

    let first = session_service
        .create_session(ada.id(), Duration::hours(1))
        .await
        .unwrap();
    let second = session_service
        .create_session(ada.id(), Duration::hours(1))
        .await
        .unwrap();

    assert_ne!(first.token(), second.token());
}

#[tokio::test]
async fn unknown_token_resolves_to_nobody() {
    let db = common::setup_db().await.unwrap();
    let session_service = SessionService::new(&db);

    let resolved = session_service.resolve_user("not-a-session").await.unwrap();

    assert!(resolved.is_none());
}

#[tokio::test]
async fn expired_session_is_discarded() {
    let db = common::setup_db().await.unwrap();
    let ada = UserService::new(&db)
        .create_user("a@x.io".to_string(), "Ada".to_string(), "pw")
        .await
        .unwrap();
    let session_service = SessionService::new(&db);
    let session = session_service
        .create_session(ada.id(), Duration::hours(-1))
        .await
        .unwrap();

    let resolved = session_service.resolve_user(session.token()).await.unwrap();

    assert!(resolved.is_none());
    assert_eq!(session::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn deleted_session_no_longer_resolves() {
    let db = common::setup_db().await.unwrap();
    let ada = UserService::new(&db)
        .create_user("a@x.io".to_string(), "Ada".to_string(), "pw")
        .await
        .unwrap();
    let session_service = SessionService::new(&db);
    let session = session_service
        .create_session(ada.id(), Duration::hours(1))
        .await
        .unwrap();

    session_service.delete_session(session.token()).await.unwrap();

    assert!(session_service.resolve_user(session.token()).await.unwrap().is_none());
    // Deleting twice is harmless.
    session_service.delete_session(session.token()).await.unwrap();
}

#[tokio::test]
async fn session_of_deleted_user_resolves_to_nobody() {
    let db = common::setup_db().await.unwrap();
    let ada = UserService::new(&db)
        .create_user("a@x.io".to_string(), "Ada".to_string(), "pw")
        .await
        .unwrap();
    let session_service = SessionService::new(&db);
    let session = session_service
        .create_session(ada.id(), Duration::hours(1))
        .await
        .unwrap();

    users::Entity::delete_by_id(ada.id() as i32)
        .exec(&db)
        .await
        .unwrap();

    assert!(session_service.resolve_user(session.token()).await.unwrap().is_none());
}

#[tokio::test]
async fn opening_a_session_sweeps_abandoned_expired_ones() {
    let db = common::setup_db().await.unwrap();
    let ada = UserService::new(&db)
        .create_user("a@x.io".to_string(), "Ada".to_string(), "pw")
        .await
        .unwrap();
    for n in 0..5 {
        insert_expired_session(&db, &format!("expired-{}", n), ada.id()).await;
    }
    let session_service = SessionService::new(&db);

    let live = session_service
        .create_session(ada.id(), Duration::hours(1))
        .await
        .unwrap();

    let remaining = session::Entity::find().all(&db).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, live.token());
}

#[tokio::test]
async fn delete_expired_sessions_keeps_live_ones() {
    let db = common::setup_db().await.unwrap();
    let ada = UserService::new(&db)
        .create_user("a@x.io".to_string(), "Ada".to_string(), "pw")
        .await
        .unwrap();
    let session_service = SessionService::new(&db);
    let live = session_service
        .create_session(ada.id(), Duration::hours(1))
        .await
        .unwrap();
    insert_expired_session(&db, "expired-a", ada.id()).await;
    insert_expired_session(&db, "expired-b", ada.id()).await;

    let removed = session_service.delete_expired_sessions().await.unwrap();

    assert_eq!(removed, 2);
    assert_eq!(session::Entity::find().count(&db).await.unwrap(), 1);
    assert!(session_service.resolve_user(live.token()).await.unwrap().is_some());
}

#[tokio::test]
async fn session_lifetime_beyond_the_calendar_is_rejected() {
    let db = common::setup_db().await.unwrap();
    let ada = UserService::new(&db)
        .create_user("a@x.io".to_string(), "Ada".to_string(), "pw")
        .await
        .unwrap();
    let session_service = SessionService::new(&db);

    let result = session_service
        .create_session(ada.id(), Duration::days(1_000_000_000))
        .await;

    assert!(matches!(result, Err(SessionServiceError::TtlOutOfRange(_))));
    assert_eq!(session::Entity::find().count(&db).await.unwrap(), 0);
}
