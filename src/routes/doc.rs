use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        notifications::{
            BroadcastRequest, BroadcastSummary, DeviceTokenRequest, MarkAllReadSummary,
            NotificationList, SendToUserRequest, SendToUsersRequest,
        },
        orders::{CreateOrderRequest, OrderItemRequest, OrderList, UpdateOrderStatusRequest},
    },
    models::{
        KindCount, LineItem, Notification, NotificationStats, Order, OrderStats, OrderStatus,
        StatusCounts, UserSummary,
    },
    response::{ApiResponse, Meta},
    routes::{health, notifications, orders, params},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        orders::create_order,
        orders::my_orders,
        orders::get_order,
        orders::cancel_order,
        orders::list_all_orders,
        orders::update_order_status,
        orders::order_stats,
        notifications::register_device_token,
        notifications::send_test_notification,
        notifications::my_notifications,
        notifications::mark_notification_read,
        notifications::send_to_user,
        notifications::broadcast,
        notifications::mark_all_read,
        notifications::send_to_users,
        notifications::all_notifications,
        notifications::notification_stats,
        notifications::delete_notification
    ),
    components(
        schemas(
            Order,
            LineItem,
            OrderStatus,
            OrderStats,
            StatusCounts,
            UserSummary,
            Notification,
            NotificationStats,
            KindCount,
            CreateOrderRequest,
            OrderItemRequest,
            UpdateOrderStatusRequest,
            OrderList,
            DeviceTokenRequest,
            SendToUserRequest,
            BroadcastRequest,
            BroadcastSummary,
            SendToUsersRequest,
            MarkAllReadSummary,
            NotificationList,
            params::Pagination,
            params::OrderListQuery,
            params::NotificationListQuery,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<OrderStats>,
            ApiResponse<Notification>,
            ApiResponse<NotificationList>,
            ApiResponse<BroadcastSummary>,
            ApiResponse<NotificationStats>,
            ApiResponse<MarkAllReadSummary>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Orders", description = "Customer order endpoints"),
        (name = "Notifications", description = "Device token and inbox endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> serde_json::Value {
        serde_json::to_value(ApiDoc::openapi()).unwrap()
    }

    #[test]
    fn admin_order_listing_documents_its_default_page_size() {
        let doc = document();
        let get = &doc["paths"]["/api/orders"]["get"];
        let description = get["responses"]["200"]["description"].as_str().unwrap();
        assert!(description.contains("first 20"), "{description}");

        let per_page = get["parameters"]
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["name"] == "per_page")
            .expect("per_page parameter");
        assert!(per_page["description"].as_str().unwrap().contains("Defaults to 20"));
    }

    #[test]
    fn notification_admin_routes_are_documented() {
        let doc = document();
        let paths = doc["paths"].as_object().unwrap();
        for path in [
            "/api/notifications/read-all",
            "/api/notifications/send-to-users",
            "/api/notifications/all",
            "/api/notifications/stats",
            "/api/notifications/{id}",
        ] {
            assert!(paths.contains_key(path), "{path} missing");
        }
    }
}
