use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NotificationKind, NotificationPayload, OrderStatus};

/// A device-ready message.
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error("push delivery is disabled")]
    Disabled,

    #[error("push rejected: {0}")]
    Rejected(String),
}

/// Device messaging backend. Returns the gateway's message id.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, device_token: &str, message: &PushMessage) -> Result<String, PushError>;
}

/// Gateway that only logs; stands in for a real device-messaging provider.
#[derive(Debug, Clone)]
pub struct LogPushGateway {
    enabled: bool,
}

impl LogPushGateway {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl PushGateway for LogPushGateway {
    async fn send(&self, device_token: &str, message: &PushMessage) -> Result<String, PushError> {
        if !self.enabled {
            tracing::debug!(title = %message.title, "push disabled, message not sent");
            return Err(PushError::Disabled);
        }
        if device_token.trim().is_empty() {
            return Err(PushError::Rejected("empty device token".into()));
        }
        let message_id = format!("log-{}", Uuid::new_v4());
        tracing::info!(
            message_id = %message_id,
            title = %message.title,
            body = %message.body,
            "push message sent"
        );
        Ok(message_id)
    }
}

fn status_sentence(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Order received and pending confirmation",
        OrderStatus::Confirmed => "Order confirmed and being prepared",
        OrderStatus::Preparing => "Your order is being prepared",
        OrderStatus::Ready => "Your order is ready for pickup!",
        OrderStatus::Delivered => "Order delivered successfully",
        OrderStatus::Cancelled => "Order has been cancelled",
    }
}

/// Build the customer-facing text for a notification.
pub fn compose_message(kind: NotificationKind, payload: &NotificationPayload) -> PushMessage {
    let mut data = BTreeMap::new();
    data.insert("type".to_string(), kind.as_str().to_string());

    let (title, body) = match payload {
        NotificationPayload::Message { title, body } => (title.clone(), body.clone()),
        NotificationPayload::Order {
            order_id,
            total_price,
            status,
        } => {
            data.insert("orderId".to_string(), order_id.to_string());
            if let Some(total) = total_price {
                data.insert("totalPrice".to_string(), total.to_string());
            }
            if let Some(status) = status {
                data.insert("status".to_string(), status.as_str().to_string());
            }
            match (kind, total_price, status) {
                (NotificationKind::OrderConfirmed, total, _) => (
                    "Order Confirmed!".to_string(),
                    match total {
                        Some(total) => format!("Your order #{order_id} has been confirmed. Total: ${total}"),
                        None => format!("Your order #{order_id} has been confirmed."),
                    },
                ),
                (NotificationKind::OrderReady, _, _) => (
                    "Order Ready!".to_string(),
                    format!("Your order #{order_id} is ready for pickup!"),
                ),
                (_, _, Some(status)) => (
                    "Order Update".to_string(),
                    format!("Order #{order_id}: {}", status_sentence(*status)),
                ),
                (_, _, None) => (
                    "Order Update".to_string(),
                    format!("Order #{order_id} has been updated"),
                ),
            }
        }
    };

    PushMessage { title, body, data }
}
