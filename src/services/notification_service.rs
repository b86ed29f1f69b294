use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::notifications::{
        BroadcastRequest, BroadcastSummary, DeviceTokenRequest, MarkAllReadSummary,
        NotificationList, SendToUserRequest, SendToUsersRequest,
    },
    entity::{
        notifications::{
            ActiveModel as NotificationActive, Column as NotificationCol, Entity as Notifications,
            Model as NotificationModel,
        },
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{
        DeliveryStatus, KindCount, Notification, NotificationKind, NotificationPayload,
        NotificationStats, UserSummary,
    },
    response::{ApiResponse, Meta},
    routes::params::{NotificationListQuery, Pagination},
    services::{
        notifier::{NotificationDelivery, NotificationJob},
        push::{PushGateway, PushMessage, compose_message},
    },
};

/// Persists notification records and pushes them through the gateway.
#[derive(Clone)]
pub struct NotificationService {
    orm: DatabaseConnection,
    gateway: Arc<dyn PushGateway>,
}

impl NotificationService {
    pub fn new(orm: DatabaseConnection, gateway: Arc<dyn PushGateway>) -> Self {
        Self { orm, gateway }
    }

    pub async fn register_device_token(
        &self,
        user: &AuthUser,
        payload: DeviceTokenRequest,
    ) -> AppResult<ApiResponse<serde_json::Value>> {
        let token = payload.token.trim();
        if token.is_empty() {
            return Err(AppError::Validation("token is required".into()));
        }

        let existing = Users::find_by_id(user.user_id)
            .one(&self.orm)
            .await?
            .ok_or_else(|| AppError::NotFound("User".into()))?;

        let mut active: UserActive = existing.into();
        active.fcm_token = Set(Some(token.to_string()));
        active.update(&self.orm).await?;

        tracing::info!(user_id = %user.user_id, "device token registered");
        Ok(ApiResponse::success(
            "Device token updated",
            serde_json::json!({}),
            Some(Meta::empty()),
        ))
    }

    pub async fn send_test(&self, user: &AuthUser) -> AppResult<ApiResponse<Notification>> {
        let token = self
            .device_token(user.user_id)
            .await?
            .ok_or_else(|| AppError::BadRequest("no device token registered".into()))?;

        let message = compose_message(
            NotificationKind::TestNotification,
            &NotificationPayload::Message {
                title: "Test Notification".into(),
                body: "Push notifications are working.".into(),
            },
        );
        let record = self
            .record_and_send(Some(user.user_id), &token, NotificationKind::TestNotification, &message, None)
            .await?;

        Ok(ApiResponse::success("Test notification processed", notification_from_entity(record), Some(Meta::empty())))
    }

    pub async fn send_to_user(
        &self,
        admin: &AuthUser,
        payload: SendToUserRequest,
    ) -> AppResult<ApiResponse<Notification>> {
        ensure_admin(admin)?;
        validate_text(&payload.title, &payload.body)?;

        let recipient = Users::find_by_id(payload.user_id)
            .one(&self.orm)
            .await?
            .ok_or_else(|| AppError::NotFound("User".into()))?;
        let token = recipient
            .fcm_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("user has no device token".into()))?;

        let message = compose_message(
            NotificationKind::ManualNotification,
            &NotificationPayload::Message {
                title: payload.title,
                body: payload.body,
            },
        );
        let record = self
            .record_and_send(
                Some(recipient.id),
                &token,
                NotificationKind::ManualNotification,
                &message,
                Some(admin.user_id),
            )
            .await?;

        Ok(ApiResponse::success("Notification processed", notification_from_entity(record), Some(Meta::empty())))
    }

    /// Send an admin notification to every user with a device token.
    /// Recipients are attempted one by one; failures are counted.
    pub async fn broadcast(
        &self,
        admin: &AuthUser,
        payload: BroadcastRequest,
    ) -> AppResult<ApiResponse<BroadcastSummary>> {
        ensure_admin(admin)?;
        validate_text(&payload.title, &payload.body)?;

        let recipients: Vec<(Uuid, Option<String>)> = Users::find()
            .select_only()
            .column(UserCol::Id)
            .column(UserCol::FcmToken)
            .filter(UserCol::FcmToken.is_not_null())
            .into_tuple()
            .all(&self.orm)
            .await?;
        let recipients: Vec<(Uuid, String)> = recipients
            .into_iter()
            .filter_map(|(id, token)| token.filter(|t| !t.trim().is_empty()).map(|t| (id, t)))
            .collect();

        if recipients.is_empty() {
            return Err(AppError::BadRequest("No users with device tokens found".into()));
        }

        let message = compose_message(
            NotificationKind::AdminNotification,
            &NotificationPayload::Message {
                title: payload.title,
                body: payload.body,
            },
        );

        let summary = self
            .fan_out(recipients, NotificationKind::AdminNotification, &message, admin.user_id)
            .await;

        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "admin broadcast finished"
        );
        Ok(ApiResponse::success("Broadcast processed", summary, Some(Meta::empty())))
    }

    /// Send a manual notification to a chosen set of users. Users without a
    /// device token are left out of the fan-out.
    pub async fn send_to_users(
        &self,
        admin: &AuthUser,
        payload: SendToUsersRequest,
    ) -> AppResult<ApiResponse<BroadcastSummary>> {
        ensure_admin(admin)?;
        if payload.user_ids.is_empty() {
            return Err(AppError::Validation("user_ids, title and body are required".into()));
        }
        validate_text(&payload.title, &payload.body)?;

        let users = Users::find()
            .filter(UserCol::Id.is_in(payload.user_ids))
            .all(&self.orm)
            .await?;
        if users.is_empty() {
            return Err(AppError::NotFound("Users".into()));
        }

        let recipients: Vec<(Uuid, String)> = users
            .into_iter()
            .filter_map(|u| u.fcm_token.filter(|t| !t.trim().is_empty()).map(|t| (u.id, t)))
            .collect();
        if recipients.is_empty() {
            return Err(AppError::BadRequest("No users have device tokens".into()));
        }

        let message = compose_message(
            NotificationKind::ManualNotification,
            &NotificationPayload::Message {
                title: payload.title,
                body: payload.body,
            },
        );
        let summary = self
            .fan_out(recipients, NotificationKind::ManualNotification, &message, admin.user_id)
            .await;

        Ok(ApiResponse::success("Notifications processed", summary, Some(Meta::empty())))
    }

    pub async fn list_for_user(
        &self,
        user: &AuthUser,
        pagination: Pagination,
    ) -> AppResult<ApiResponse<NotificationList>> {
        let (page, limit, offset) = pagination.normalize();

        let finder = Notifications::find()
            .filter(NotificationCol::UserId.eq(user.user_id))
            .order_by_desc(NotificationCol::CreatedAt);

        let total = finder.clone().count(&self.orm).await? as i64;

        let items = finder
            .limit(limit as u64)
            .offset(offset as u64)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(notification_from_entity)
            .collect();

        Ok(ApiResponse::success(
            "Ok",
            NotificationList { items },
            Some(Meta::new(page, limit, total)),
        ))
    }

    pub async fn mark_read(&self, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Notification>> {
        let existing = Notifications::find()
            .filter(
                Condition::all()
                    .add(NotificationCol::Id.eq(id))
                    .add(NotificationCol::UserId.eq(user.user_id)),
            )
            .one(&self.orm)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification".into()))?;

        let mut active: NotificationActive = existing.into();
        active.is_read = Set(true);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&self.orm).await?;

        Ok(ApiResponse::success(
            "Notification marked as read",
            notification_from_entity(updated),
            Some(Meta::empty()),
        ))
    }

    pub async fn mark_all_read(&self, user: &AuthUser) -> AppResult<ApiResponse<MarkAllReadSummary>> {
        let result = Notifications::update_many()
            .col_expr(NotificationCol::IsRead, Expr::value(true))
            .col_expr(NotificationCol::UpdatedAt, Expr::value(Utc::now()))
            .filter(NotificationCol::UserId.eq(user.user_id))
            .filter(NotificationCol::IsRead.eq(false))
            .exec(&self.orm)
            .await?;

        Ok(ApiResponse::success(
            "All notifications marked as read",
            MarkAllReadSummary {
                updated: result.rows_affected,
            },
            Some(Meta::empty()),
        ))
    }

    /// Every notification record, newest first, with its recipient attached.
    pub async fn list_all(
        &self,
        admin: &AuthUser,
        query: NotificationListQuery,
    ) -> AppResult<ApiResponse<NotificationList>> {
        ensure_admin(admin)?;

        let mut condition = Condition::all();
        if let Some(status) = query.status()? {
            condition = condition.add(NotificationCol::Status.eq(status.as_str()));
        }
        if let Some(kind) = query.kind()? {
            condition = condition.add(NotificationCol::Kind.eq(kind.as_str()));
        }
        if let Some(user_id) = query.user_id {
            condition = condition.add(NotificationCol::UserId.eq(user_id));
        }
        let (page, limit, offset) = query.pagination().normalize();

        let total = Notifications::find()
            .filter(condition.clone())
            .count(&self.orm)
            .await? as i64;

        let items = Notifications::find()
            .find_also_related(Users)
            .filter(condition)
            .order_by_desc(NotificationCol::CreatedAt)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(|(record, recipient)| {
                let mut notification = notification_from_entity(record);
                notification.recipient = recipient.map(|u| UserSummary {
                    id: u.id,
                    full_name: u.full_name,
                    email: u.email,
                });
                notification
            })
            .collect();

        Ok(ApiResponse::success(
            "Notifications",
            NotificationList { items },
            Some(Meta::new(page, limit, total)),
        ))
    }

    pub async fn stats(&self, admin: &AuthUser) -> AppResult<ApiResponse<NotificationStats>> {
        ensure_admin(admin)?;

        let by_status: Vec<(String, i64)> = Notifications::find()
            .select_only()
            .column(NotificationCol::Status)
            .column_as(Expr::col(NotificationCol::Id).count(), "count")
            .group_by(NotificationCol::Status)
            .into_tuple()
            .all(&self.orm)
            .await?;
        let count_of = |status: DeliveryStatus| {
            by_status
                .iter()
                .filter(|(s, _)| s == status.as_str())
                .map(|(_, n)| *n)
                .sum::<i64>()
        };

        let by_kind: Vec<(String, i64)> = Notifications::find()
            .select_only()
            .column(NotificationCol::Kind)
            .column_as(Expr::col(NotificationCol::Id).count(), "count")
            .group_by(NotificationCol::Kind)
            .order_by_asc(NotificationCol::Kind)
            .into_tuple()
            .all(&self.orm)
            .await?;

        let recent = Notifications::find()
            .order_by_desc(NotificationCol::CreatedAt)
            .limit(5)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(notification_from_entity)
            .collect();

        let stats = NotificationStats {
            total: by_status.iter().map(|(_, n)| n).sum(),
            sent: count_of(DeliveryStatus::Sent),
            failed: count_of(DeliveryStatus::Failed),
            pending: count_of(DeliveryStatus::Pending),
            by_kind: by_kind
                .into_iter()
                .map(|(kind, count)| KindCount { kind, count })
                .collect(),
            recent,
        };
        Ok(ApiResponse::success("OK", stats, Some(Meta::empty())))
    }

    pub async fn delete(&self, admin: &AuthUser, id: Uuid) -> AppResult<ApiResponse<serde_json::Value>> {
        ensure_admin(admin)?;

        let result = Notifications::delete_by_id(id).exec(&self.orm).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Notification".into()));
        }

        tracing::info!(notification_id = %id, by = %admin.user_id, "notification deleted");
        Ok(ApiResponse::success(
            "Notification deleted successfully",
            serde_json::json!({ "id": id }),
            Some(Meta::empty()),
        ))
    }

    /// Send one message to each recipient in turn. A failure is counted and
    /// the remaining recipients are still attempted.
    async fn fan_out(
        &self,
        recipients: Vec<(Uuid, String)>,
        kind: NotificationKind,
        message: &PushMessage,
        sent_by: Uuid,
    ) -> BroadcastSummary {
        let mut summary = BroadcastSummary {
            total: recipients.len(),
            ..Default::default()
        };
        for (user_id, token) in recipients {
            let outcome = self
                .record_and_send(Some(user_id), &token, kind, message, Some(sent_by))
                .await;
            match outcome {
                Ok(record) if record.status == DeliveryStatus::Sent.as_str() => summary.succeeded += 1,
                Ok(_) => summary.failed += 1,
                Err(err) => {
                    tracing::warn!(error = %err, %user_id, %kind, "notification recipient failed");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    async fn device_token(&self, user_id: Uuid) -> AppResult<Option<String>> {
        let user = Users::find_by_id(user_id).one(&self.orm).await?;
        Ok(user
            .and_then(|u| u.fcm_token)
            .filter(|t| !t.trim().is_empty()))
    }

    /// Persist a pending record, push it, then record the outcome.
    /// A gateway failure is recorded on the row, not returned.
    async fn record_and_send(
        &self,
        user_id: Option<Uuid>,
        token: &str,
        kind: NotificationKind,
        message: &PushMessage,
        sent_by: Option<Uuid>,
    ) -> AppResult<NotificationModel> {
        let record = NotificationActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            title: Set(message.title.clone()),
            body: Set(message.body.clone()),
            kind: Set(kind.as_str().to_string()),
            data: Set(Some(serde_json::to_value(&message.data)?)),
            status: Set(DeliveryStatus::Pending.as_str().to_string()),
            is_read: Set(false),
            sent_at: Set(None),
            fcm_message_id: Set(None),
            error_message: Set(None),
            sent_by: Set(sent_by),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&self.orm)
        .await?;

        let outcome = self.gateway.send(token, message).await;

        let mut active: NotificationActive = record.into();
        match outcome {
            Ok(message_id) => {
                active.status = Set(DeliveryStatus::Sent.as_str().to_string());
                active.sent_at = Set(Some(Utc::now().into()));
                active.fcm_message_id = Set(Some(message_id));
            }
            Err(err) => {
                tracing::warn!(error = %err, kind = %kind, "push send failed");
                active.status = Set(DeliveryStatus::Failed.as_str().to_string());
                active.error_message = Set(Some(err.to_string()));
            }
        }
        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&self.orm).await?)
    }
}

#[async_trait]
impl NotificationDelivery for NotificationService {
    async fn deliver(&self, job: &NotificationJob) -> AppResult<()> {
        let Some(token) = self.device_token(job.recipient).await? else {
            tracing::debug!(recipient = %job.recipient, kind = %job.kind, "no device token, skipping");
            return Ok(());
        };

        let message = compose_message(job.kind, &job.payload);
        let record = self
            .record_and_send(Some(job.recipient), &token, job.kind, &message, None)
            .await?;

        if record.status == DeliveryStatus::Failed.as_str() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "push failed: {}",
                record.error_message.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

fn validate_text(title: &str, body: &str) -> AppResult<()> {
    if title.trim().is_empty() || body.trim().is_empty() {
        return Err(AppError::Validation("title and body are required".into()));
    }
    Ok(())
}

fn notification_from_entity(model: NotificationModel) -> Notification {
    Notification {
        id: model.id,
        user_id: model.user_id,
        title: model.title,
        body: model.body,
        kind: model.kind,
        data: model.data,
        status: model.status,
        is_read: model.is_read,
        sent_at: model.sent_at.map(|dt| dt.with_timezone(&Utc)),
        fcm_message_id: model.fcm_message_id,
        error_message: model.error_message,
        sent_by: model.sent_by,
        created_at: model.created_at.with_timezone(&Utc),
        recipient: None,
    }
}
