use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CreateOrderRequest, OrderList, UpdateOrderStatusRequest},
    error::AppResult,
    middleware::{auth::AuthUser, json::AppJson},
    models::{Order, OrderStats},
    response::ApiResponse,
    routes::params::OrderListQuery,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all_orders).post(create_order))
        .route("/my", get(my_orders))
        .route("/stats/overview", get(order_stats))
        .route("/{id}", get(get_order))
        .route("/{id}/cancel", patch(cancel_order))
        .route("/{id}/status", patch(update_order_status))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<Order>),
        (status = 400, description = "Invalid items, unknown or unavailable menu item"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Order>>)> {
    let resp = state.orders.create_order(&user, payload).await?;
    if let Some(order) = resp.data.as_ref() {
        audit::record_order_event(
            &state.pool,
            user.user_id,
            "order_created",
            serde_json::json!({ "order_id": order.id, "total_price": order.total_price }),
        )
        .await;
    }
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/orders/my",
    responses(
        (status = 200, description = "Caller's orders, newest first", body = ApiResponse<OrderList>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn my_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = state.orders.list_orders_for_user(user.user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order with the placing user", body = ApiResponse<Order>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = state.orders.get_order(&user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<Order>),
        (status = 400, description = "Order can no longer be cancelled"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = state.orders.cancel_order(&user, id).await?;
    audit::record_order_event(
        &state.pool,
        user.user_id,
        "order_cancelled",
        serde_json::json!({ "order_id": id }),
    )
    .await;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "All orders with their users (admin only), newest first. Paginated: only the first 20 matches are returned unless page/per_page are given", body = ApiResponse<OrderList>),
        (status = 400, description = "Invalid status filter"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = state.orders.list_all_orders(&user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated", body = ApiResponse<Order>),
        (status = 400, description = "Invalid status or order already finished"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = state.orders.update_status(&user, id, payload).await?;
    if let Some(order) = resp.data.as_ref() {
        audit::record_order_event(
            &state.pool,
            user.user_id,
            "order_status_update",
            serde_json::json!({ "order_id": order.id, "status": order.status }),
        )
        .await;
    }
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/stats/overview",
    responses(
        (status = 200, description = "Order counts per status and delivered revenue", body = ApiResponse<OrderStats>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn order_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OrderStats>>> {
    let resp = state.orders.get_stats(&user).await?;
    Ok(Json(resp))
}
