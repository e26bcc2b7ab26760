use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use cartline_core::ProductId;

use super::{count, money, to_db_int};
use crate::db::{ProductRepository, RepositoryError};
use crate::models::{NewProduct, Product, ProductFilter, ProductPage, ProductUpdate};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    category: String,
    image_url: String,
    stock: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price: money(row.price, "price")?,
            category: row.category,
            image_url: row.image_url,
            stock: count(row.stock, "stock")?,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Build an `ILIKE` pattern that matches `needle` literally anywhere.
fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

// =============================================================================
// Repository
// =============================================================================

/// Product catalog stored in `cartline.product`.
#[derive(Debug, Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn create(&self, input: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO cartline.product (name, description, price, category, image_url, stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, description, price, category, image_url, stock, is_active,
                      created_at, updated_at
            ",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price.amount())
        .bind(&input.category)
        .bind(&input.image_url)
        .bind(to_db_int(input.stock, "stock")?)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, description, price, category, image_url, stock, is_active,
                   created_at, updated_at
            FROM cartline.product
            WHERE id = $1 AND is_active
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self, filter: &ProductFilter) -> Result<ProductPage, RepositoryError> {
        let category = filter.category.as_deref().filter(|c| !c.is_empty());
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(contains_pattern);

        let (total,): (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*)
            FROM cartline.product
            WHERE is_active
              AND ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL OR name ILIKE $2 OR description ILIKE $2)
            ",
        )
        .bind(category)
        .bind(search.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, description, price, category, image_url, stock, is_active,
                   created_at, updated_at
            FROM cartline.product
            WHERE is_active
              AND ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL OR name ILIKE $2 OR description ILIKE $2)
            ORDER BY id
            LIMIT $3 OFFSET $4
            ",
        )
        .bind(category)
        .bind(search.as_deref())
        .bind(i64::from(filter.limit()))
        .bind(i64::from(filter.offset()))
        .fetch_all(&self.pool)
        .await?;

        Ok(ProductPage {
            products: rows
                .into_iter()
                .map(TryInto::try_into)
                .collect::<Result<_, _>>()?,
            total: u64::try_from(total).unwrap_or(0),
            page: filter.page.max(1),
            limit: filter.limit(),
        })
    }

    async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r"
            SELECT DISTINCT category
            FROM cartline.product
            WHERE is_active
            ORDER BY category
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(category,)| category).collect())
    }

    async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let stock = update
            .stock
            .map(|stock| to_db_int(stock, "stock"))
            .transpose()?;

        let row = sqlx::query_as::<_, ProductRow>(
            r"
            UPDATE cartline.product
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                category = COALESCE($5, category),
                image_url = COALESCE($6, image_url),
                stock = COALESCE($7, stock),
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, price, category, image_url, stock, is_active,
                      created_at, updated_at
            ",
        )
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.description.as_deref())
        .bind(update.price.map(|price| price.amount()))
        .bind(update.category.as_deref())
        .bind(update.image_url.as_deref())
        .bind(stock)
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn deactivate(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE cartline.product
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<u32, RepositoryError> {
        // Single conditional statement: concurrent adjustments serialize on
        // the row lock and none can take stock below zero.
        let updated: Option<(i32,)> = sqlx::query_as(
            r"
            UPDATE cartline.product
            SET stock = stock + $2, updated_at = NOW()
            WHERE id = $1 AND stock + $2 >= 0
            RETURNING stock
            ",
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((stock,)) = updated {
            return count(stock, "stock");
        }

        let current: Option<(i32,)> =
            sqlx::query_as("SELECT stock FROM cartline.product WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match current {
            Some((stock,)) => Err(RepositoryError::InsufficientStock {
                available: count(stock, "stock")?,
            }),
            None => Err(RepositoryError::NotFound),
        }
    }
}
