use std::sync::Arc;

use async_trait::async_trait;
use chickzone_api::{
    db::{create_orm_conn, run_migrations},
    dto::notifications::{BroadcastRequest, BroadcastSummary, SendToUsersRequest},
    entity::users::ActiveModel as UserActive,
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::{NotificationListQuery, Pagination},
    services::{
        notification_service::NotificationService,
        push::{PushError, PushGateway, PushMessage},
    },
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, Set, Statement};
use uuid::Uuid;

const GOOD_TOKEN: &str = "device-good";
const BAD_TOKEN: &str = "device-unregistered";

/// Accepts every device except one unregistered token.
struct FlakyGateway;

#[async_trait]
impl PushGateway for FlakyGateway {
    async fn send(&self, device_token: &str, _message: &PushMessage) -> Result<String, PushError> {
        if device_token == BAD_TOKEN {
            return Err(PushError::Rejected("registration token not registered".into()));
        }
        Ok(format!("msg-{}", Uuid::new_v4()))
    }
}

// Integration flow: admin fan-outs keep going past a failing device; records, stats,
// read flags and deletion reflect what happened.
#[tokio::test]
async fn fan_out_counts_failures_without_blocking_other_recipients() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let orm = setup(&database_url).await?;
    let service = NotificationService::new(orm.clone(), Arc::new(FlakyGateway));

    let alice = customer(create_user(&orm, "alice@example.com", "customer", Some(GOOD_TOKEN)).await?);
    let bob = customer(create_user(&orm, "bob@example.com", "customer", Some(BAD_TOKEN)).await?);
    let carol = customer(create_user(&orm, "carol@example.com", "customer", None).await?);
    let admin = AuthUser {
        user_id: create_user(&orm, "admin@example.com", "admin", None).await?,
        role: "admin".into(),
    };

    // Broadcast reaches every user with a token; bob's failure does not stop alice's
    let summary = service
        .broadcast(
            &admin,
            BroadcastRequest {
                title: "Two for one".into(),
                body: "Buckets are two for one tonight".into(),
            },
        )
        .await?
        .data
        .unwrap();
    assert_eq!(
        summary,
        BroadcastSummary {
            total: 2,
            succeeded: 1,
            failed: 1
        }
    );

    let alice_inbox = service.list_for_user(&alice, Pagination::default()).await?.data.unwrap();
    assert_eq!(alice_inbox.items.len(), 1);
    assert_eq!(alice_inbox.items[0].status, "sent");
    assert_eq!(alice_inbox.items[0].kind, "admin_notification");
    assert_eq!(alice_inbox.items[0].sent_by, Some(admin.user_id));
    assert!(alice_inbox.items[0].fcm_message_id.is_some());

    let bob_inbox = service.list_for_user(&bob, Pagination::default()).await?.data.unwrap();
    assert_eq!(bob_inbox.items.len(), 1);
    assert_eq!(bob_inbox.items[0].status, "failed");
    assert!(bob_inbox.items[0]
        .error_message
        .as_deref()
        .is_some_and(|e| e.contains("not registered")));

    // Targeted send skips carol, who has no token, and counts the same way
    let summary = service
        .send_to_users(
            &admin,
            SendToUsersRequest {
                user_ids: vec![alice.user_id, bob.user_id, carol.user_id],
                title: "Your usual?".into(),
                body: "Reorder in one tap".into(),
            },
        )
        .await?
        .data
        .unwrap();
    assert_eq!(
        summary,
        BroadcastSummary {
            total: 2,
            succeeded: 1,
            failed: 1
        }
    );

    let err = service
        .send_to_users(
            &admin,
            SendToUsersRequest {
                user_ids: vec![carol.user_id],
                title: "Hi".into(),
                body: "There".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = service
        .send_to_users(
            &admin,
            SendToUsersRequest {
                user_ids: vec![Uuid::new_v4()],
                title: "Hi".into(),
                body: "There".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = service
        .send_to_users(
            &alice,
            SendToUsersRequest {
                user_ids: vec![bob.user_id],
                title: "Hi".into(),
                body: "There".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Admin listing filters by delivery status and attaches the recipient
    let failed = service
        .list_all(
            &admin,
            NotificationListQuery {
                status: Some("failed".into()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(failed.meta.as_ref().and_then(|m| m.total), Some(2));
    let failed = failed.data.unwrap();
    assert!(failed.items.iter().all(|n| n.user_id == Some(bob.user_id)));
    assert!(failed
        .items
        .iter()
        .all(|n| n.recipient.as_ref().map(|r| r.email.as_str()) == Some("bob@example.com")));

    let err = service
        .list_all(
            &admin,
            NotificationListQuery {
                kind: Some("promo".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let stats = service.stats(&admin).await?.data.unwrap();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.sent, 2);
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.pending, 0);
    let kinds: Vec<_> = stats
        .by_kind
        .iter()
        .map(|k| (k.kind.as_str(), k.count))
        .collect();
    assert_eq!(kinds, vec![("admin_notification", 2), ("manual_notification", 2)]);
    assert_eq!(stats.recent.len(), 4);

    // Read flags are per user
    let marked = service.mark_all_read(&alice).await?.data.unwrap();
    assert_eq!(marked.updated, 2);
    let marked = service.mark_all_read(&alice).await?.data.unwrap();
    assert_eq!(marked.updated, 0);
    let bob_inbox = service.list_for_user(&bob, Pagination::default()).await?.data.unwrap();
    assert!(bob_inbox.items.iter().all(|n| !n.is_read));

    // Deletion is admin only and reports missing records
    let target = bob_inbox.items[0].id;
    let err = service.delete(&bob, target).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    service.delete(&admin, target).await?;
    let err = service.delete(&admin, target).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(service.stats(&admin).await?.data.unwrap().total, 3);

    Ok(())
}

fn customer(user_id: Uuid) -> AuthUser {
    AuthUser {
        user_id,
        role: "customer".into(),
    }
}

async fn setup(database_url: &str) -> anyhow::Result<DatabaseConnection> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE notifications, audit_logs, orders, menus, users CASCADE",
    ))
    .await?;

    Ok(orm)
}

async fn create_user(
    orm: &DatabaseConnection,
    email: &str,
    role: &str,
    token: Option<&str>,
) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        full_name: Set(format!("Test {email}")),
        email: Set(email.to_string()),
        role: Set(role.into()),
        fcm_token: Set(token.map(str::to_string)),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;

    Ok(user.id)
}
