use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// No transition may leave a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value.trim())
            .ok_or_else(|| AppError::Validation(format!("Invalid order status '{value}'")))
    }
}

/// Snapshot of a menu entry captured into an order when it is placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LineItem {
    pub catalog_item_id: Uuid,
    pub name: String,
    #[schema(value_type = String, example = "12.50")]
    pub unit_price: Decimal,
    #[schema(value_type = String, example = "10")]
    pub discount_percent: Decimal,
    pub quantity: i32,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<LineItem>,
    #[schema(value_type = String, example = "33.50")]
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Placing user; filled on single-order and admin list reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

impl Order {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// An order ready to be persisted; timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<LineItem>,
    pub total_price: Decimal,
}

/// Live menu entry as seen by the order pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CatalogItem {
    pub id: Uuid,
    pub name: String,
    #[schema(value_type = String)]
    pub price: Decimal,
    #[schema(value_type = String)]
    pub discount_percent: Decimal,
    pub available: bool,
}

/// Per-status aggregate produced by the order store.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSummary {
    pub status: OrderStatus,
    pub count: i64,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct StatusCounts {
    pub pending: i64,
    pub confirmed: i64,
    pub preparing: i64,
    pub ready: i64,
    pub delivered: i64,
    pub cancelled: i64,
}

impl StatusCounts {
    pub fn add(&mut self, status: OrderStatus, count: i64) {
        let slot = match status {
            OrderStatus::Pending => &mut self.pending,
            OrderStatus::Confirmed => &mut self.confirmed,
            OrderStatus::Preparing => &mut self.preparing,
            OrderStatus::Ready => &mut self.ready,
            OrderStatus::Delivered => &mut self.delivered,
            OrderStatus::Cancelled => &mut self.cancelled,
        };
        *slot += count;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderStats {
    pub total_orders: i64,
    pub by_status: StatusCounts,
    /// Sum of `total_price` over delivered orders only.
    #[schema(value_type = String, example = "120.00")]
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderConfirmed,
    OrderReady,
    OrderUpdate,
    AdminNotification,
    TestNotification,
    ManualNotification,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 6] = [
        NotificationKind::OrderConfirmed,
        NotificationKind::OrderReady,
        NotificationKind::OrderUpdate,
        NotificationKind::AdminNotification,
        NotificationKind::TestNotification,
        NotificationKind::ManualNotification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::OrderConfirmed => "order_confirmed",
            NotificationKind::OrderReady => "order_ready",
            NotificationKind::OrderUpdate => "order_update",
            NotificationKind::AdminNotification => "admin_notification",
            NotificationKind::TestNotification => "test_notification",
            NotificationKind::ManualNotification => "manual_notification",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        NotificationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value.trim())
            .ok_or_else(|| AppError::Validation(format!("Invalid notification type '{value}'")))
    }
}

/// What a notification is about.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationPayload {
    Order {
        order_id: Uuid,
        total_price: Option<Decimal>,
        status: Option<OrderStatus>,
    },
    Message {
        title: String,
        body: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 3] = [
        DeliveryStatus::Pending,
        DeliveryStatus::Sent,
        DeliveryStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        DeliveryStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value.trim())
            .ok_or_else(|| AppError::Validation(format!("Invalid delivery status '{value}'")))
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    pub kind: String,
    pub data: Option<serde_json::Value>,
    pub status: String,
    pub is_read: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub fcm_message_id: Option<String>,
    pub error_message: Option<String>,
    pub sent_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    /// Only set on the admin listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<UserSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct KindCount {
    pub kind: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotificationStats {
    pub total: i64,
    pub sent: i64,
    pub failed: i64,
    pub pending: i64,
    pub by_kind: Vec<KindCount>,
    /// The five most recent records, newest first.
    pub recent: Vec<Notification>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_wire_name() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        let err = "shipped".parse::<OrderStatus>().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn only_delivered_and_cancelled_are_terminal() {
        let terminal: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(OrderStatus::is_terminal)
            .collect();
        assert_eq!(terminal, vec![OrderStatus::Delivered, OrderStatus::Cancelled]);
    }

    #[test]
    fn notification_filters_parse_wire_names() {
        for kind in NotificationKind::ALL {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
        assert_eq!("failed".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::Failed);
        assert!(matches!("promo".parse::<NotificationKind>(), Err(AppError::Validation(_))));
        assert!(matches!("lost".parse::<DeliveryStatus>(), Err(AppError::Validation(_))));
    }

    #[test]
    fn status_counts_accumulate_per_slot() {
        let mut counts = StatusCounts::default();
        counts.add(OrderStatus::Ready, 2);
        counts.add(OrderStatus::Ready, 1);
        counts.add(OrderStatus::Cancelled, 4);
        assert_eq!(counts.ready, 3);
        assert_eq!(counts.cancelled, 4);
        assert_eq!(counts.pending, 0);
    }
}
