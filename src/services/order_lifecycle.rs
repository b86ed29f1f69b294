//! Status rules for orders.
//!
//! Non-terminal statuses may move freely between each other; `delivered`
//! and `cancelled` accept no further writes. Cancellation is narrower: only
//! `pending` and `confirmed` orders can be cancelled, and customers may only
//! cancel their own.

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{NotificationKind, NotificationPayload, Order, OrderStatus},
};

/// A requested status write, checked against the stored order inside the
/// store's write transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusChange {
    /// Administrative status write.
    Update { next: OrderStatus },
    /// `owner` is `None` when an administrator cancels, which skips the
    /// ownership check.
    Cancel { owner: Option<Uuid> },
}

impl StatusChange {
    pub fn target(&self) -> OrderStatus {
        match self {
            StatusChange::Update { next } => *next,
            StatusChange::Cancel { .. } => OrderStatus::Cancelled,
        }
    }

    pub fn check(&self, order: &Order) -> AppResult<()> {
        match self {
            StatusChange::Update { next } => {
                if order.status.is_terminal() {
                    return Err(AppError::IllegalTransition(format!(
                        "Cannot change status of a {} order to {}",
                        order.status, next
                    )));
                }
                Ok(())
            }
            StatusChange::Cancel { owner } => {
                if let Some(owner) = owner {
                    if !order.is_owned_by(*owner) {
                        return Err(AppError::Forbidden(
                            "You can only cancel your own orders".into(),
                        ));
                    }
                }
                if !order.status.is_cancellable() {
                    return Err(AppError::IllegalTransition(
                        "Can only cancel pending or confirmed orders".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Notification owed to the customer after a successful status write.
pub fn status_notification(order: &Order) -> Option<(NotificationKind, NotificationPayload)> {
    let kind = match order.status {
        OrderStatus::Pending => return None,
        OrderStatus::Ready => NotificationKind::OrderReady,
        _ => NotificationKind::OrderUpdate,
    };
    let status = (kind == NotificationKind::OrderUpdate).then_some(order.status);
    Some((
        kind,
        NotificationPayload::Order {
            order_id: order.id,
            total_price: None,
            status,
        },
    ))
}

/// Notification sent once an order has been placed.
pub fn confirmation_notification(order: &Order) -> (NotificationKind, NotificationPayload) {
    (
        NotificationKind::OrderConfirmed,
        NotificationPayload::Order {
            order_id: order.id,
            total_price: Some(order.total_price),
            status: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    fn order(owner: Uuid, status: OrderStatus) -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id: owner,
            items: Vec::new(),
            total_price: Decimal::new(1250, 2),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            user: None,
        }
    }

    #[test]
    fn terminal_orders_reject_updates() {
        for status in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            let change = StatusChange::Update {
                next: OrderStatus::Preparing,
            };
            let err = change.check(&order(Uuid::new_v4(), status)).unwrap_err();
            assert!(matches!(err, AppError::IllegalTransition(_)));
        }
    }

    #[test]
    fn non_terminal_statuses_move_freely() {
        for from in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
        ] {
            for next in OrderStatus::ALL {
                let change = StatusChange::Update { next };
                assert!(change.check(&order(Uuid::new_v4(), from)).is_ok(), "{from} -> {next}");
            }
        }
    }

    #[test]
    fn cancel_requires_pending_or_confirmed() {
        let owner = Uuid::new_v4();
        let change = StatusChange::Cancel { owner: Some(owner) };
        assert!(change.check(&order(owner, OrderStatus::Pending)).is_ok());
        assert!(change.check(&order(owner, OrderStatus::Confirmed)).is_ok());
        for status in [
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            let err = change.check(&order(owner, status)).unwrap_err();
            assert!(matches!(err, AppError::IllegalTransition(_)), "{status}");
        }
    }

    #[test]
    fn cancel_checks_ownership_unless_admin() {
        let owner = Uuid::new_v4();
        let placed = order(owner, OrderStatus::Pending);

        let stranger = StatusChange::Cancel {
            owner: Some(Uuid::new_v4()),
        };
        assert!(matches!(stranger.check(&placed), Err(AppError::Forbidden(_))));

        let admin = StatusChange::Cancel { owner: None };
        assert!(admin.check(&placed).is_ok());
        assert_eq!(admin.target(), OrderStatus::Cancelled);
    }

    #[test]
    fn ready_gets_its_own_notification() {
        let placed = order(Uuid::new_v4(), OrderStatus::Ready);
        let (kind, payload) = status_notification(&placed).unwrap();
        assert_eq!(kind, NotificationKind::OrderReady);
        assert_eq!(
            payload,
            NotificationPayload::Order {
                order_id: placed.id,
                total_price: None,
                status: None,
            }
        );
    }

    #[test]
    fn other_statuses_get_a_generic_update() {
        assert!(status_notification(&order(Uuid::new_v4(), OrderStatus::Pending)).is_none());
        for status in [
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            let (kind, payload) = status_notification(&order(Uuid::new_v4(), status)).unwrap();
            assert_eq!(kind, NotificationKind::OrderUpdate);
            assert!(matches!(payload, NotificationPayload::Order { status: Some(s), .. } if s == status));
        }
    }
}
