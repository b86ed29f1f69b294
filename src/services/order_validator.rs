//! Turns submitted order lines into priced-ready snapshots.
//!
//! Shape checks run over the whole request before any catalog lookup so a
//! malformed request never touches the menu.

use uuid::Uuid;

use crate::{
    dto::orders::OrderItemRequest,
    error::{AppError, AppResult},
    models::LineItem,
    services::catalog::CatalogLookup,
};

pub const MAX_QUANTITY: i32 = 999;

struct CheckedLine {
    catalog_item_id: Uuid,
    quantity: i32,
    notes: String,
}

fn check_shape(raw_items: &[OrderItemRequest]) -> AppResult<Vec<CheckedLine>> {
    if raw_items.is_empty() {
        return Err(AppError::Validation("missing required fields".into()));
    }

    raw_items
        .iter()
        .map(|raw| {
            let (Some(catalog_item_id), Some(quantity)) = (raw.catalog_item_id, raw.quantity) else {
                return Err(AppError::Validation("missing required fields".into()));
            };
            if quantity < 1 {
                return Err(AppError::Validation("missing required fields".into()));
            }
            if quantity > MAX_QUANTITY {
                return Err(AppError::Validation(format!(
                    "quantity must be at most {MAX_QUANTITY}"
                )));
            }
            Ok(CheckedLine {
                catalog_item_id,
                quantity,
                notes: raw
                    .notes
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string(),
            })
        })
        .collect()
}

/// Resolve every line against the catalog, in input order.
///
/// Each line copies name, price and discount from the catalog as of its own
/// lookup; nothing is cached between calls.
pub async fn validate_items(
    catalog: &dyn CatalogLookup,
    raw_items: &[OrderItemRequest],
) -> AppResult<Vec<LineItem>> {
    let lines = check_shape(raw_items)?;

    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let entry = catalog
            .resolve(line.catalog_item_id)
            .await?
            .ok_or(AppError::CatalogItemNotFound(line.catalog_item_id))?;

        if !entry.available {
            return Err(AppError::Unavailable(entry.name));
        }

        items.push(LineItem {
            catalog_item_id: entry.id,
            name: entry.name,
            unit_price: entry.price,
            discount_percent: entry.discount_percent,
            quantity: line.quantity,
            notes: line.notes,
        });
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::CatalogItem;

    #[derive(Default)]
    struct FakeCatalog {
        items: HashMap<Uuid, CatalogItem>,
        lookups: Mutex<Vec<Uuid>>,
    }

    impl FakeCatalog {
        fn with(mut self, name: &str, price: Decimal, discount: Decimal, available: bool) -> (Self, Uuid) {
            let id = Uuid::new_v4();
            self.items.insert(
                id,
                CatalogItem {
                    id,
                    name: name.into(),
                    price,
                    discount_percent: discount,
                    available,
                },
            );
            (self, id)
        }
    }

    #[async_trait]
    impl CatalogLookup for FakeCatalog {
        async fn resolve(&self, id: Uuid) -> AppResult<Option<CatalogItem>> {
            self.lookups.lock().unwrap().push(id);
            Ok(self.items.get(&id).cloned())
        }
    }

    fn line(id: Uuid, quantity: i32, notes: Option<&str>) -> OrderItemRequest {
        OrderItemRequest {
            catalog_item_id: Some(id),
            quantity: Some(quantity),
            notes: notes.map(Into::into),
        }
    }

    #[tokio::test]
    async fn snapshots_catalog_fields_in_input_order() {
        let (catalog, wings) = FakeCatalog::default().with("Wings", Decimal::new(999, 2), Decimal::from(5), true);
        let (catalog, fries) = catalog.with("Fries", Decimal::new(350, 2), Decimal::ZERO, true);

        let items = validate_items(
            &catalog,
            &[line(fries, 2, Some("  extra salt ")), line(wings, 1, None)],
        )
        .await
        .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Fries");
        assert_eq!(items[0].notes, "extra salt");
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[1].name, "Wings");
        assert_eq!(items[1].unit_price, Decimal::new(999, 2));
        assert_eq!(items[1].discount_percent, Decimal::from(5));
        assert_eq!(items[1].notes, "");
    }

    #[tokio::test]
    async fn empty_request_is_rejected_without_lookups() {
        let catalog = FakeCatalog::default();
        let err = validate_items(&catalog, &[]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(catalog.lookups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_fields_and_bad_quantities_are_rejected() {
        let (catalog, id) = FakeCatalog::default().with("Wings", Decimal::ONE, Decimal::ZERO, true);

        let no_id = OrderItemRequest {
            catalog_item_id: None,
            quantity: Some(1),
            notes: None,
        };
        let no_qty = OrderItemRequest {
            catalog_item_id: Some(id),
            quantity: None,
            notes: None,
        };

        for bad in [no_id, no_qty, line(id, 0, None), line(id, -3, None), line(id, MAX_QUANTITY + 1, None)] {
            let err = validate_items(&catalog, &[line(id, 1, None), bad]).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
        }
        assert!(catalog.lookups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_item_names_the_id() {
        let catalog = FakeCatalog::default();
        let ghost = Uuid::new_v4();
        let err = validate_items(&catalog, &[line(ghost, 1, None)]).await.unwrap_err();
        assert!(matches!(err, AppError::CatalogItemNotFound(id) if id == ghost));
    }

    #[tokio::test]
    async fn unavailable_item_names_the_item() {
        let (catalog, id) = FakeCatalog::default().with("Sold Out Burger", Decimal::TEN, Decimal::ZERO, false);
        let err = validate_items(&catalog, &[line(id, 1, None)]).await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable(ref name) if name == "Sold Out Burger"));
    }
}
