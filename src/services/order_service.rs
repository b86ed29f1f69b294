use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, UpdateOrderStatusRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{NewOrder, Order, OrderStats, OrderStatus, StatusCounts},
    pricing::{price_order, to_money},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::{
        catalog::CatalogLookup,
        notifier::Notifier,
        order_lifecycle::{StatusChange, confirmation_notification, status_notification},
        order_store::{OrderFilter, OrderStore},
        order_validator::validate_items,
    },
};

/// Order lifecycle: placement, reads, status writes and the notifications
/// they trigger.
#[derive(Clone)]
pub struct OrderService {
    catalog: Arc<dyn CatalogLookup>,
    store: Arc<dyn OrderStore>,
    notifier: Arc<dyn Notifier>,
}

impl OrderService {
    pub fn new(
        catalog: Arc<dyn CatalogLookup>,
        store: Arc<dyn OrderStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            catalog,
            store,
            notifier,
        }
    }

    /// Validate, price and persist a new `pending` order. Nothing is stored
    /// unless every line resolves.
    pub async fn create_order(
        &self,
        user: &AuthUser,
        payload: CreateOrderRequest,
    ) -> AppResult<ApiResponse<Order>> {
        let items = validate_items(self.catalog.as_ref(), &payload.items).await?;
        let total_price = price_order(&items);

        let order = self
            .store
            .insert(NewOrder {
                id: Uuid::new_v4(),
                user_id: user.user_id,
                items,
                total_price,
            })
            .await?;

        tracing::info!(
            order_id = %order.id,
            user_id = %order.user_id,
            total = %order.total_price,
            lines = order.items.len(),
            "order created"
        );

        let (kind, payload) = confirmation_notification(&order);
        self.notifier.notify(order.user_id, kind, payload);

        Ok(ApiResponse::success(
            "Order created successfully",
            order,
            Some(Meta::empty()),
        ))
    }

    pub async fn get_order(&self, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Order>> {
        let order = self
            .store
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".into()))?;

        if !user.is_admin() && !order.is_owned_by(user.user_id) {
            return Err(AppError::Forbidden(
                "You can only view your own orders".into(),
            ));
        }

        Ok(ApiResponse::success("OK", order, Some(Meta::empty())))
    }

    pub async fn list_orders_for_user(&self, user_id: Uuid) -> AppResult<ApiResponse<OrderList>> {
        let orders = self.store.list_for_user(user_id).await?;
        let meta = Meta::count(orders.len());
        Ok(ApiResponse::success(
            "Ok",
            OrderList { items: orders },
            Some(meta),
        ))
    }

    pub async fn list_all_orders(
        &self,
        user: &AuthUser,
        query: OrderListQuery,
    ) -> AppResult<ApiResponse<OrderList>> {
        ensure_admin(user)?;
        let filter = OrderFilter {
            status: query.status()?,
            user_id: query.user_id,
        };
        let (page, limit, offset) = query.pagination().normalize();

        let (orders, total) = self
            .store
            .list(&filter, limit as u64, offset as u64)
            .await?;

        let meta = Meta::new(page, limit, total as i64);
        Ok(ApiResponse::success(
            "Orders",
            OrderList { items: orders },
            Some(meta),
        ))
    }

    pub async fn update_status(
        &self,
        user: &AuthUser,
        id: Uuid,
        payload: UpdateOrderStatusRequest,
    ) -> AppResult<ApiResponse<Order>> {
        ensure_admin(user)?;
        let next: OrderStatus = payload.status.parse()?;

        let order = self
            .store
            .transition(id, &StatusChange::Update { next })
            .await?;

        tracing::info!(order_id = %order.id, status = %order.status, "order status updated");
        self.notify_status(&order);

        Ok(ApiResponse::success(
            "Order status updated successfully",
            order,
            Some(Meta::empty()),
        ))
    }

    pub async fn cancel_order(&self, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Order>> {
        let owner = if user.is_admin() {
            None
        } else {
            Some(user.user_id)
        };

        let order = self
            .store
            .transition(id, &StatusChange::Cancel { owner })
            .await?;

        tracing::info!(order_id = %order.id, by = %user.user_id, "order cancelled");
        self.notify_status(&order);

        Ok(ApiResponse::success(
            "Order cancelled successfully",
            order,
            Some(Meta::empty()),
        ))
    }

    pub async fn get_stats(&self, user: &AuthUser) -> AppResult<ApiResponse<OrderStats>> {
        ensure_admin(user)?;

        let mut by_status = StatusCounts::default();
        let mut total_orders = 0;
        let mut total_revenue = Decimal::ZERO;
        for summary in self.store.status_summary().await? {
            by_status.add(summary.status, summary.count);
            total_orders += summary.count;
            if summary.status == OrderStatus::Delivered {
                total_revenue += summary.total_price;
            }
        }

        let stats = OrderStats {
            total_orders,
            by_status,
            total_revenue: to_money(total_revenue),
        };
        Ok(ApiResponse::success("OK", stats, Some(Meta::empty())))
    }

    fn notify_status(&self, order: &Order) {
        if let Some((kind, payload)) = status_notification(order) {
            self.notifier.notify(order.user_id, kind, payload);
        }
    }
}
