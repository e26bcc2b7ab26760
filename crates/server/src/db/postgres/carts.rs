use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use cartline_core::{CartId, SessionToken, UserId};

use super::money;
use crate::db::{CartRepository, RepositoryError};
use crate::models::{Cart, CartMutation, CartOwner, LineItem};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: i32,
    user_id: Option<i32>,
    session_id: Option<String>,
    items: Json<Vec<LineItem>>,
    total_amount: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let owner = match (row.user_id, row.session_id) {
            (Some(user_id), None) => CartOwner::User(UserId::new(user_id)),
            (None, Some(session_id)) => {
                CartOwner::Session(SessionToken::parse(&session_id).map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid session id in database: {e}"))
                })?)
            }
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "cart {} must have exactly one owner",
                    row.id
                )));
            }
        };

        Ok(Self {
            id: CartId::new(row.id),
            owner,
            items: row.items.0,
            total_amount: money(row.total_amount, "cart total")?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            expires_at: row.expires_at,
        })
    }
}

/// Upsert for a user-owned cart. Resets the row if it has expired.
const UPSERT_USER_CART: &str = r"
    INSERT INTO cartline.cart AS c (user_id, session_id, created_at, updated_at, expires_at)
    VALUES ($1, NULL, $2, $2, $3)
    ON CONFLICT (user_id) WHERE user_id IS NOT NULL DO UPDATE
    SET items = CASE WHEN c.expires_at <= $2 THEN '[]'::jsonb ELSE c.items END,
        total_amount = CASE WHEN c.expires_at <= $2 THEN 0 ELSE c.total_amount END,
        created_at = CASE WHEN c.expires_at <= $2 THEN $2 ELSE c.created_at END,
        updated_at = CASE WHEN c.expires_at <= $2 THEN $2 ELSE c.updated_at END,
        expires_at = CASE WHEN c.expires_at <= $2 THEN $3 ELSE c.expires_at END
    RETURNING id, user_id, session_id, items, total_amount, created_at, updated_at, expires_at
";

/// Upsert for a session-owned cart. Resets the row if it has expired.
const UPSERT_SESSION_CART: &str = r"
    INSERT INTO cartline.cart AS c (user_id, session_id, created_at, updated_at, expires_at)
    VALUES (NULL, $1, $2, $2, $3)
    ON CONFLICT (session_id) WHERE session_id IS NOT NULL DO UPDATE
    SET items = CASE WHEN c.expires_at <= $2 THEN '[]'::jsonb ELSE c.items END,
        total_amount = CASE WHEN c.expires_at <= $2 THEN 0 ELSE c.total_amount END,
        created_at = CASE WHEN c.expires_at <= $2 THEN $2 ELSE c.created_at END,
        updated_at = CASE WHEN c.expires_at <= $2 THEN $2 ELSE c.updated_at END,
        expires_at = CASE WHEN c.expires_at <= $2 THEN $3 ELSE c.expires_at END
    RETURNING id, user_id, session_id, items, total_amount, created_at, updated_at, expires_at
";

// =============================================================================
// Repository
// =============================================================================

/// Carts stored in `cartline.cart`.
#[derive(Debug, Clone)]
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn find_active(
        &self,
        owner: &CartOwner,
        now: DateTime<Utc>,
    ) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, user_id, session_id, items, total_amount, created_at, updated_at, expires_at
            FROM cartline.cart
            WHERE (user_id = $1 OR session_id = $2) AND expires_at > $3
            ",
        )
        .bind(owner.user_id())
        .bind(owner.session_token().map(SessionToken::as_str))
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_or_create(
        &self,
        owner: &CartOwner,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Cart, RepositoryError> {
        let query = match owner {
            CartOwner::User(user_id) => sqlx::query_as::<_, CartRow>(UPSERT_USER_CART).bind(*user_id),
            CartOwner::Session(token) => {
                sqlx::query_as::<_, CartRow>(UPSERT_SESSION_CART).bind(token.as_str())
            }
        };

        let row = query
            .bind(now)
            .bind(now + ttl)
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn apply(
        &self,
        cart_id: CartId,
        mutation: CartMutation,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Row lock: concurrent mutations of this cart wait here.
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, user_id, session_id, items, total_amount, created_at, updated_at, expires_at
            FROM cartline.cart
            WHERE id = $1
            FOR UPDATE
            ",
        )
        .bind(cart_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let mut cart = Cart::try_from(row)?;
        if cart.is_expired(now) {
            cart.renew(now, ttl);
        }
        // A rejected mutation drops `tx`, which rolls back and releases the lock.
        cart.apply(mutation, now, ttl)?;

        sqlx::query(
            r"
            UPDATE cartline.cart
            SET items = $2, total_amount = $3, created_at = $4, updated_at = $5, expires_at = $6
            WHERE id = $1
            ",
        )
        .bind(cart.id)
        .bind(Json(&cart.items))
        .bind(cart.total_amount.amount())
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .bind(cart.expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(cart)
    }

    async fn reap_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cartline.cart WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
