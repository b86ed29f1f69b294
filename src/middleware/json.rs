use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// `Json` body extractor whose rejections use the API error envelope.
///
/// A body that is not valid JSON, has the wrong shape or lacks the JSON
/// content type is a `400` validation error rather than axum's plain-text
/// `415`/`422`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::{StatusCode, header}};

    use super::*;
    use crate::dto::orders::{CreateOrderRequest, UpdateOrderStatusRequest};

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/api/orders")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn reject<T: DeserializeOwned>(req: Request) -> AppError {
        match AppJson::<T>::from_request(req, &()).await {
            Ok(_) => panic!("body should have been rejected"),
            Err(err) => err,
        }
    }

    #[tokio::test]
    async fn malformed_order_bodies_are_validation_errors() {
        for body in [
            r#"{"items":[{"catalog_item_id":"not-a-uuid","quantity":1}]}"#,
            r#"{"items":[{"catalogItemId":"not-a-uuid","quantity":1}]}"#,
            r#"{"items":[{"catalog_item_id":"6f1c1f0e-4a53-4f35-9a0e-3f1b8d1d2a11","quantity":"2"}]}"#,
            r#"{"items":"nope"}"#,
            r#"{"items":["#,
        ] {
            let err = reject::<CreateOrderRequest>(json_request(body)).await;
            assert!(matches!(err, AppError::Validation(_)), "{body}: {err:?}");
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn missing_status_field_is_a_validation_error() {
        let err = reject::<UpdateOrderStatusRequest>(json_request("{}")).await;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_content_type_is_a_validation_error() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/orders")
            .body(Body::from(r#"{"items":[]}"#))
            .unwrap();
        let err = reject::<CreateOrderRequest>(req).await;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn well_formed_bodies_pass_through() {
        let req = json_request(
            r#"{"items":[{"menuId":"6f1c1f0e-4a53-4f35-9a0e-3f1b8d1d2a11","quantity":2,"notes":"extra crispy"}]}"#,
        );
        let AppJson(payload) = AppJson::<CreateOrderRequest>::from_request(req, &())
            .await
            .unwrap();
        assert_eq!(payload.items.len(), 1);
        assert_eq!(payload.items[0].quantity, Some(2));
        assert_eq!(payload.items[0].notes.as_deref(), Some("extra crispy"));
    }
}
