use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Notification;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeviceTokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BroadcastRequest {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendToUserRequest {
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendToUsersRequest {
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
    pub title: String,
    pub body: String,
}

/// Outcome of a fan-out; failures are counted, never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct BroadcastSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationList {
    pub items: Vec<Notification>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MarkAllReadSummary {
    pub updated: u64,
}
