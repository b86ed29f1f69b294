use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, patch, post, put},
};
use uuid::Uuid;

use crate::{
    dto::notifications::{
        BroadcastRequest, BroadcastSummary, DeviceTokenRequest, MarkAllReadSummary,
        NotificationList, SendToUserRequest, SendToUsersRequest,
    },
    error::AppResult,
    middleware::{auth::AuthUser, json::AppJson},
    models::{Notification, NotificationStats},
    response::ApiResponse,
    routes::params::{NotificationListQuery, Pagination},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/device-token", put(register_device_token))
        .route("/test", post(send_test_notification))
        .route("/my", get(my_notifications))
        .route("/read-all", patch(mark_all_read))
        .route("/{id}/read", patch(mark_notification_read))
        .route("/{id}", delete(delete_notification))
        .route("/send", post(send_to_user))
        .route("/send-to-users", post(send_to_users))
        .route("/broadcast", post(broadcast))
        .route("/all", get(all_notifications))
        .route("/stats", get(notification_stats))
}

#[utoipa::path(
    put,
    path = "/api/notifications/device-token",
    request_body = DeviceTokenRequest,
    responses(
        (status = 200, description = "Device token stored", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Missing token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn register_device_token(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<DeviceTokenRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = state.notifications.register_device_token(&user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/notifications/test",
    responses(
        (status = 200, description = "Test notification processed", body = ApiResponse<Notification>),
        (status = 400, description = "No device token registered"),
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn send_test_notification(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let resp = state.notifications.send_test(&user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/notifications/my",
    params(Pagination),
    responses(
        (status = 200, description = "Caller's notifications, newest first", body = ApiResponse<NotificationList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn my_notifications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<NotificationList>>> {
    let resp = state.notifications.list_for_user(&user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/notifications/{id}/read",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Marked as read", body = ApiResponse<Notification>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let resp = state.notifications.mark_read(&user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/notifications/send",
    request_body = SendToUserRequest,
    responses(
        (status = 200, description = "Notification processed", body = ApiResponse<Notification>),
        (status = 400, description = "Recipient has no device token"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown user"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn send_to_user(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<SendToUserRequest>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let resp = state.notifications.send_to_user(&user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/notifications/broadcast",
    request_body = BroadcastRequest,
    responses(
        (status = 200, description = "Per-recipient delivery counts", body = ApiResponse<BroadcastSummary>),
        (status = 400, description = "No recipients"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn broadcast(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<BroadcastRequest>,
) -> AppResult<Json<ApiResponse<BroadcastSummary>>> {
    let resp = state.notifications.broadcast(&user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/notifications/read-all",
    responses(
        (status = 200, description = "Caller's unread notifications marked as read", body = ApiResponse<MarkAllReadSummary>),
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<MarkAllReadSummary>>> {
    let resp = state.notifications.mark_all_read(&user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/notifications/send-to-users",
    request_body = SendToUsersRequest,
    responses(
        (status = 200, description = "Per-recipient delivery counts", body = ApiResponse<BroadcastSummary>),
        (status = 400, description = "Missing fields or no recipient has a device token"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "None of the users exist"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn send_to_users(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<SendToUsersRequest>,
) -> AppResult<Json<ApiResponse<BroadcastSummary>>> {
    let resp = state.notifications.send_to_users(&user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/notifications/all",
    params(NotificationListQuery),
    responses(
        (status = 200, description = "All notifications with recipients, newest first. 20 per page unless per_page is given", body = ApiResponse<NotificationList>),
        (status = 400, description = "Invalid status or type filter"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn all_notifications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<NotificationListQuery>,
) -> AppResult<Json<ApiResponse<NotificationList>>> {
    let resp = state.notifications.list_all(&user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/notifications/stats",
    responses(
        (status = 200, description = "Counts per delivery status and type, plus the latest records", body = ApiResponse<NotificationStats>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn notification_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<NotificationStats>>> {
    let resp = state.notifications.stats(&user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = state.notifications.delete(&user, id).await?;
    Ok(Json(resp))
}
