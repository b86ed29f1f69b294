use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    entity::{
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        users::{Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    models::{LineItem, NewOrder, Order, OrderStatus, StatusSummary, UserSummary},
    services::order_lifecycle::StatusChange,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub user_id: Option<Uuid>,
}

/// Durable home of orders; the single source of truth for `status`.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: NewOrder) -> AppResult<Order>;

    /// One order with its placing user attached.
    async fn find(&self, id: Uuid) -> AppResult<Option<Order>>;

    /// All orders of one user, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Order>>;

    /// Filtered page of orders with their placing users, newest first, plus
    /// the unpaged match count.
    async fn list(&self, filter: &OrderFilter, limit: u64, offset: u64) -> AppResult<(Vec<Order>, u64)>;

    /// Apply `change` to the stored order. The check and the write happen
    /// atomically with respect to other writers of the same order.
    async fn transition(&self, id: Uuid, change: &StatusChange) -> AppResult<Order>;

    async fn status_summary(&self) -> AppResult<Vec<StatusSummary>>;
}

#[derive(Clone)]
pub struct SeaOrderStore {
    orm: DatabaseConnection,
}

impl SeaOrderStore {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }
}

#[async_trait]
impl OrderStore for SeaOrderStore {
    async fn insert(&self, order: NewOrder) -> AppResult<Order> {
        let model = OrderActive {
            id: Set(order.id),
            user_id: Set(order.user_id),
            items: Set(serde_json::to_value(&order.items)?),
            total_price: Set(order.total_price),
            status: Set(OrderStatus::Pending.as_str().to_string()),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&self.orm)
        .await?;

        order_from_entity(model)
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Order>> {
        Orders::find_by_id(id)
            .find_also_related(Users)
            .one(&self.orm)
            .await?
            .map(|(order, user)| order_with_user(order, user))
            .transpose()
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Order>> {
        Orders::find()
            .filter(OrderCol::UserId.eq(user_id))
            .order_by_desc(OrderCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect()
    }

    async fn list(&self, filter: &OrderFilter, limit: u64, offset: u64) -> AppResult<(Vec<Order>, u64)> {
        let mut condition = Condition::all();
        if let Some(status) = filter.status {
            condition = condition.add(OrderCol::Status.eq(status.as_str()));
        }
        if let Some(user_id) = filter.user_id {
            condition = condition.add(OrderCol::UserId.eq(user_id));
        }

        let total = Orders::find()
            .filter(condition.clone())
            .count(&self.orm)
            .await?;

        let orders = Orders::find()
            .find_also_related(Users)
            .filter(condition)
            .order_by_desc(OrderCol::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(|(order, user)| order_with_user(order, user))
            .collect::<AppResult<Vec<_>>>()?;

        Ok((orders, total))
    }

    async fn transition(&self, id: Uuid, change: &StatusChange) -> AppResult<Order> {
        let txn = self.orm.begin().await?;

        let existing = Orders::find_by_id(id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".into()))?;

        change.check(&order_from_entity(existing.clone())?)?;

        let mut active: OrderActive = existing.into();
        active.status = Set(change.target().as_str().to_string());
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        order_from_entity(updated)
    }

    async fn status_summary(&self) -> AppResult<Vec<StatusSummary>> {
        #[derive(Debug, FromQueryResult)]
        struct StatusRow {
            status: String,
            count: i64,
            total_price: Option<Decimal>,
        }

        Orders::find()
            .select_only()
            .column(OrderCol::Status)
            .column_as(Expr::col(OrderCol::Id).count(), "count")
            .column_as(Expr::col(OrderCol::TotalPrice).sum(), "total_price")
            .group_by(OrderCol::Status)
            .into_model::<StatusRow>()
            .all(&self.orm)
            .await?
            .into_iter()
            .map(|row| {
                Ok(StatusSummary {
                    status: parse_stored_status(&row.status)?,
                    count: row.count,
                    total_price: row.total_price.unwrap_or(Decimal::ZERO),
                })
            })
            .collect()
    }
}

fn parse_stored_status(value: &str) -> AppResult<OrderStatus> {
    value
        .parse()
        .map_err(|_| AppError::Internal(anyhow::anyhow!("unknown stored order status '{value}'")))
}

fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let items: Vec<LineItem> = serde_json::from_value(model.items)?;
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        items,
        total_price: model.total_price,
        status: parse_stored_status(&model.status)?,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
        user: None,
    })
}

fn order_with_user(model: OrderModel, user: Option<UserModel>) -> AppResult<Order> {
    let mut order = order_from_entity(model)?;
    order.user = user.map(|u| UserSummary {
        id: u.id,
        full_name: u.full_name,
        email: u.email,
    });
    Ok(order)
}
