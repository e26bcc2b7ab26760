//! Line items shared by carts and orders.

use serde::{Deserialize, Serialize};

use cartline_core::{Money, MoneyError, ProductId};

use super::Product;

/// A product snapshot paired with a quantity.
///
/// Name, price and image are copied from the product when the item is first
/// added to a cart. Later catalog edits do not change them; checkout
/// re-validates availability against the live product instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
    pub image_url: String,
}

impl LineItem {
    /// Snapshot a product at the given quantity.
    #[must_use]
    pub fn snapshot(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            quantity,
            image_url: product.image_url.clone(),
        }
    }

    /// `price × quantity`.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::TooLarge` if the line total exceeds [`Money::MAX`].
    pub fn line_total(&self) -> Result<Money, MoneyError> {
        self.price.checked_times(self.quantity)
    }
}

/// Recompute a total from scratch.
///
/// # Errors
///
/// Returns `MoneyError::TooLarge` if any line or the running total exceeds
/// [`Money::MAX`].
pub fn total_of(items: &[LineItem]) -> Result<Money, MoneyError> {
    items
        .iter()
        .try_fold(Money::ZERO, |total, item| total.checked_add(item.line_total()?))
}
