use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use cartline_core::{
    OrderId, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus, UserId,
};

use super::money;
use crate::db::{OrderRepository, RepositoryError, conflict_on_unique};
use crate::models::{Address, LineItem, NewOrder, Order};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    order_number: String,
    items: Json<Vec<LineItem>>,
    total_amount: Decimal,
    shipping_address: Json<Address>,
    billing_address: Json<Address>,
    payment_method: PaymentMethod,
    status: OrderStatus,
    payment_status: PaymentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            order_number: OrderNumber::from_stored(row.order_number),
            items: row.items.0,
            total_amount: money(row.total_amount, "order total")?,
            shipping_address: row.shipping_address.0,
            billing_address: row.billing_address.0,
            payment_method: row.payment_method,
            status: row.status,
            payment_status: row.payment_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_orders(rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
    rows.into_iter().map(TryInto::try_into).collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Orders stored in `cartline.customer_order`.
#[derive(Debug, Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM cartline.customer_order WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO cartline.customer_order
                (user_id, order_number, items, total_amount, shipping_address, billing_address,
                 payment_method)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, order_number, items, total_amount, shipping_address,
                      billing_address, payment_method, status, payment_status,
                      created_at, updated_at
            ",
        )
        .bind(order.user_id)
        .bind(order.order_number.as_str())
        .bind(Json(&order.items))
        .bind(order.total_amount.amount())
        .bind(Json(&order.shipping_address))
        .bind(Json(&order.billing_address))
        .bind(order.payment_method)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "order number already exists"))?;

        row.try_into()
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, order_number, items, total_amount, shipping_address,
                   billing_address, payment_method, status, payment_status,
                   created_at, updated_at
            FROM cartline.customer_order
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_by_user(
        &self,
        user_id: UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, order_number, items, total_amount, shipping_address,
                   billing_address, payment_method, status, payment_status,
                   created_at, updated_at
            FROM cartline.customer_order
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        into_orders(rows)
    }

    async fn list_all(
        &self,
        status: Option<OrderStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, order_number, items, total_amount, shipping_address,
                   billing_address, payment_method, status, payment_status,
                   created_at, updated_at
            FROM cartline.customer_order
            WHERE $1::cartline.order_status IS NULL OR status = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(status)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        into_orders(rows)
    }

    async fn transition_status(
        &self,
        id: OrderId,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let from: Vec<&str> = from.iter().map(|status| status.as_str()).collect();

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            UPDATE cartline.customer_order
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status::text = ANY($3)
            RETURNING id, user_id, order_number, items, total_amount, shipping_address,
                      billing_address, payment_method, status, payment_status,
                      created_at, updated_at
            ",
        )
        .bind(id)
        .bind(to)
        .bind(from)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row.try_into()?)),
            None if self.exists(id).await? => Ok(None),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn set_payment_status(
        &self,
        id: OrderId,
        status: PaymentStatus,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            UPDATE cartline.customer_order
            SET payment_status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, order_number, items, total_amount, shipping_address,
                      billing_address, payment_method, status, payment_status,
                      created_at, updated_at
            ",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }
}
