use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, EntityTrait};
use uuid::Uuid;

use crate::{
    entity::menus::{Entity as Menus, Model as MenuModel},
    error::{AppError, AppResult},
    models::CatalogItem,
};

/// Read-only view of the menu used when placing orders.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Current state of a menu entry, or `None` if it does not exist.
    async fn resolve(&self, id: Uuid) -> AppResult<Option<CatalogItem>>;
}

#[derive(Clone)]
pub struct MenuCatalog {
    orm: DatabaseConnection,
}

impl MenuCatalog {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }
}

#[async_trait]
impl CatalogLookup for MenuCatalog {
    async fn resolve(&self, id: Uuid) -> AppResult<Option<CatalogItem>> {
        Menus::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(catalog_item_from_entity)
            .transpose()
    }
}

fn catalog_item_from_entity(model: MenuModel) -> AppResult<CatalogItem> {
    let discount_percent = model.discount.unwrap_or(Decimal::ZERO);
    if model.price.is_sign_negative() || discount_percent < Decimal::ZERO || discount_percent > Decimal::ONE_HUNDRED {
        return Err(AppError::Internal(anyhow::anyhow!(
            "menu item {} has an out-of-range price or discount",
            model.id
        )));
    }
    Ok(CatalogItem {
        id: model.id,
        name: model.name,
        price: model.price,
        discount_percent,
        available: model.available,
    })
}
