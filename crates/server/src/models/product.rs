//! Product catalog types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cartline_core::{Money, ProductId};

/// Default page size for catalog listings.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Upper bound on page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A catalog product with its stock counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub category: String,
    pub image_url: String,
    /// Units on hand; never negative.
    pub stock: u32,
    /// Inactive products are hidden from catalog reads but kept for order history.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub category: String,
    pub image_url: String,
    #[serde(default)]
    pub stock: u32,
}

impl NewProduct {
    /// Validate the fields a schema alone cannot express.
    ///
    /// Prices above `Money::MAX` never get this far: [`Money`] refuses them
    /// when the request body is decoded.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        require_text("name", &self.name)?;
        require_text("description", &self.description)?;
        require_text("category", &self.category)?;
        require_text("imageUrl", &self.image_url)?;
        if self.price.is_zero() {
            return Err("price must be greater than zero".to_owned());
        }
        Ok(())
    }
}

/// Partial update for a product; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub stock: Option<u32>,
    pub is_active: Option<bool>,
}

impl ProductUpdate {
    /// Validate the supplied fields.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        let texts = [
            ("name", &self.name),
            ("description", &self.description),
            ("category", &self.category),
            ("imageUrl", &self.image_url),
        ];
        for (field, value) in texts {
            if let Some(value) = value {
                require_text(field, value)?;
            }
        }
        if self.price.is_some_and(|price| price.is_zero()) {
            return Err("price must be greater than zero".to_owned());
        }
        Ok(())
    }

    /// Apply this update to a product in place.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            product.description.clone_from(description);
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(category) = &self.category {
            product.category.clone_from(category);
        }
        if let Some(image_url) = &self.image_url {
            product.image_url.clone_from(image_url);
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }
    }
}

fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} is required"));
    }
    Ok(())
}

/// Catalog listing filter. Only active products are ever listed.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    /// Case-insensitive substring match on name or description.
    pub search: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            category: None,
            search: None,
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl ProductFilter {
    /// Page size clamped to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    /// Row offset for the requested page (pages start at 1).
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.page.max(1).saturating_sub(1).saturating_mul(self.limit())
    }

    /// Whether a product passes the category and search filters.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if !product.is_active {
            return false;
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty())
            && product.category != category
        {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(needle) => {
                let needle = needle.to_lowercase();
                product.name.to_lowercase().contains(&needle)
                    || product.description.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

const fn default_page() -> u32 {
    1
}

const fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// One page of catalog results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<Product>,
    /// Total number of matching products across all pages.
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn product(id: i32, name: &str, cents: u32, stock: u32) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            name: name.to_owned(),
            description: format!("{name} description"),
            price: Money::from_cents(cents),
            category: "general".to_owned(),
            image_url: format!("https://img.example.com/{id}.png"),
            stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_filter_search_is_case_insensitive() {
        let filter = ProductFilter {
            search: Some("MUG".to_owned()),
            ..ProductFilter::default()
        };
        assert!(filter.matches(&product(1, "Coffee mug", 1200, 3)));
        assert!(!filter.matches(&product(2, "Teapot", 3000, 3)));
    }

    #[test]
    fn test_filter_excludes_inactive() {
        let mut hidden = product(1, "Mug", 1200, 3);
        hidden.is_active = false;
        assert!(!ProductFilter::default().matches(&hidden));
    }

    #[test]
    fn test_filter_paging() {
        let filter = ProductFilter {
            page: 3,
            limit: 10,
            ..ProductFilter::default()
        };
        assert_eq!(filter.offset(), 20);

        let silly = ProductFilter {
            page: 0,
            limit: 10_000,
            ..ProductFilter::default()
        };
        assert_eq!(silly.limit(), MAX_PAGE_SIZE);
        assert_eq!(silly.offset(), 0);
    }

    #[test]
    fn test_update_applies_only_given_fields() {
        let mut target = product(1, "Mug", 1200, 3);
        let update = ProductUpdate {
            stock: Some(10),
            is_active: Some(false),
            ..ProductUpdate::default()
        };
        update.apply_to(&mut target);
        assert_eq!(target.stock, 10);
        assert!(!target.is_active);
        assert_eq!(target.name, "Mug");
    }

    #[test]
    fn test_price_is_capped_at_storage_precision() {
        let body = |price: &str| {
            format!(
                r#"{{"name":"Yacht","description":"d","price":{price},"category":"c","imageUrl":"u"}}"#
            )
        };

        let at_cap: NewProduct = serde_json::from_str(&body("\"9999999999.99\"")).unwrap();
        assert_eq!(at_cap.price, Money::MAX);
        assert_eq!(at_cap.validate(), Ok(()));

        assert!(serde_json::from_str::<NewProduct>(&body("\"10000000000.00\"")).is_err());
        assert!(serde_json::from_str::<ProductUpdate>(r#"{"price":"99999999999"}"#).is_err());
    }

    #[test]
    fn test_new_product_requires_fields() {
        let input = NewProduct {
            name: " ".to_owned(),
            description: "d".to_owned(),
            price: Money::from_cents(100),
            category: "c".to_owned(),
            image_url: "u".to_owned(),
            stock: 0,
        };
        assert_eq!(input.validate(), Err("name is required".to_owned()));
    }
}
