use std::sync::Arc;

use crate::{
    db::DbPool,
    services::{notification_service::NotificationService, order_service::OrderService},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orders: OrderService,
    pub notifications: NotificationService,
    pub jwt_secret: Arc<str>,
}
