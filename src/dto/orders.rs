use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Order;

/// One submitted line. Fields are optional so that a missing field surfaces as
/// a validation error rather than a body rejection.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    #[serde(alias = "catalogItemId", alias = "menuId")]
    pub catalog_item_id: Option<Uuid>,
    pub quantity: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
