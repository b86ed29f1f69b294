use std::str::FromStr;

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{DeliveryStatus, NotificationKind, OrderStatus},
};

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    /// 1-based page number. Defaults to 1.
    pub page: Option<i64>,
    /// Page size, 1 to 100. Defaults to 20.
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    /// 1-based page number. Defaults to 1.
    pub page: Option<i64>,
    /// Page size, 1 to 100. Defaults to 20, so unpaged callers only see the newest 20 orders.
    pub per_page: Option<i64>,
    /// Only orders in this status.
    pub status: Option<String>,
    /// Only orders placed by this user.
    pub user_id: Option<Uuid>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }

    /// Blank status means "no filter"; anything else must name a known status.
    pub fn status(&self) -> AppResult<Option<OrderStatus>> {
        parse_filter(self.status.as_deref())
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationListQuery {
    /// 1-based page number. Defaults to 1.
    pub page: Option<i64>,
    /// Page size, 1 to 100. Defaults to 20.
    pub per_page: Option<i64>,
    /// Delivery status: `pending`, `sent` or `failed`.
    pub status: Option<String>,
    /// Notification type, e.g. `order_update`.
    pub kind: Option<String>,
    /// Only notifications addressed to this user.
    pub user_id: Option<Uuid>,
}

impl NotificationListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn status(&self) -> AppResult<Option<DeliveryStatus>> {
        parse_filter(self.status.as_deref())
    }

    pub fn kind(&self) -> AppResult<Option<NotificationKind>> {
        parse_filter(self.kind.as_deref())
    }
}

fn parse_filter<T>(value: Option<&str>) -> AppResult<Option<T>>
where
    T: FromStr<Err = AppError>,
{
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(p.normalize(), (1, 100, 0));
        assert_eq!(Pagination::default().normalize(), (1, 20, 0));
        let p = Pagination {
            page: Some(3),
            per_page: Some(10),
        };
        assert_eq!(p.normalize(), (3, 10, 20));
    }

    #[test]
    fn status_filter_parsing() {
        let mut q = OrderListQuery::default();
        assert_eq!(q.status().unwrap(), None);
        q.status = Some("  ".into());
        assert_eq!(q.status().unwrap(), None);
        q.status = Some("ready".into());
        assert_eq!(q.status().unwrap(), Some(OrderStatus::Ready));
        q.status = Some("lost".into());
        assert!(matches!(q.status(), Err(AppError::Validation(_))));
    }

    #[test]
    fn notification_filters_reject_unknown_values() {
        let mut q = NotificationListQuery {
            status: Some("sent".into()),
            kind: Some(" order_ready ".into()),
            ..Default::default()
        };
        assert_eq!(q.status().unwrap(), Some(DeliveryStatus::Sent));
        assert_eq!(q.kind().unwrap(), Some(NotificationKind::OrderReady));
        q.kind = Some("promo".into());
        assert!(matches!(q.kind(), Err(AppError::Validation(_))));
    }
}
