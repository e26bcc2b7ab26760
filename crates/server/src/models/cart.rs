//! Shopping carts and the rules for mutating them.
//!
//! A cart belongs to exactly one owner (a user or an anonymous session) and
//! holds product snapshots. Storage backends never edit items directly: they
//! load the cart, call [`Cart::apply`], and persist the result inside their
//! per-cart atomic section.

use chrono::{DateTime, Duration, Utc};

use cartline_core::{CartId, Money, MoneyError, ProductId, SessionToken, UserId};

use super::line_item::{LineItem, total_of};

/// Who a cart belongs to. Fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CartOwner {
    /// Authenticated user.
    User(UserId),
    /// Anonymous shopper identified by a session token.
    Session(SessionToken),
}

impl CartOwner {
    /// The owning user, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Session(_) => None,
        }
    }

    /// The owning session token, if any.
    #[must_use]
    pub const fn session_token(&self) -> Option<&SessionToken> {
        match self {
            Self::User(_) => None,
            Self::Session(token) => Some(token),
        }
    }
}

impl std::fmt::Display for CartOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Session(_) => f.write_str("session"),
        }
    }
}

/// A single change to a cart's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartMutation {
    /// Add a snapshot; merges with an existing line for the same product.
    Add {
        item: LineItem,
        /// Live stock read when the request was made (advisory).
        available_stock: u32,
    },
    /// Replace a line's quantity; zero removes it.
    SetQuantity { product_id: ProductId, quantity: u32 },
    /// Remove a line if present.
    Remove { product_id: ProductId },
    /// Remove every line.
    Clear,
}

/// Business rule violations detected while applying a [`CartMutation`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartRuleError {
    #[error("quantity must be at least 1 (got {0})")]
    InvalidQuantity(u32),

    #[error("insufficient stock for {name}: {available} available, {requested} requested")]
    InsufficientStock {
        name: String,
        available: u32,
        requested: u32,
    },

    #[error("product {0} is not in the cart")]
    LineItemNotFound(ProductId),

    #[error("cart total is too large: {0}")]
    TotalTooLarge(#[from] MoneyError),
}

/// A shopping cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    pub owner: CartOwner,
    pub items: Vec<LineItem>,
    /// Always equal to `total_of(&items)`.
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Cart {
    /// An empty cart expiring `ttl` after `now`.
    #[must_use]
    pub fn empty(id: CartId, owner: CartOwner, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id,
            owner,
            items: Vec::new(),
            total_amount: Money::ZERO,
            created_at: now,
            updated_at: now,
            expires_at: now + ttl,
        }
    }

    /// A cart at or past its expiry is treated as absent.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Turn an expired cart into a fresh empty one, keeping its id and owner.
    pub fn renew(&mut self, now: DateTime<Utc>, ttl: Duration) {
        self.items.clear();
        self.total_amount = Money::ZERO;
        self.created_at = now;
        self.updated_at = now;
        self.expires_at = now + ttl;
    }

    /// Whether the cart has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    /// Apply a mutation, then recompute the total and slide the expiry.
    ///
    /// On error the cart is left untouched.
    ///
    /// # Errors
    ///
    /// Returns a [`CartRuleError`] when the mutation breaks a cart rule,
    /// including a total that would exceed [`Money::MAX`].
    pub fn apply(
        &mut self,
        mutation: CartMutation,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), CartRuleError> {
        let previous = self.items.clone();
        if let Err(err) = self.mutate(mutation) {
            self.items = previous;
            return Err(err);
        }
        match total_of(&self.items) {
            Ok(total) => self.total_amount = total,
            Err(err) => {
                self.items = previous;
                return Err(err.into());
            }
        }

        self.updated_at = now;
        self.expires_at = now + ttl;
        Ok(())
    }

    fn mutate(&mut self, mutation: CartMutation) -> Result<(), CartRuleError> {
        match mutation {
            CartMutation::Add {
                item,
                available_stock,
            } => self.add(item, available_stock)?,
            CartMutation::SetQuantity {
                product_id,
                quantity,
            } => self.set_quantity(product_id, quantity)?,
            CartMutation::Remove { product_id } => {
                self.items.retain(|item| item.product_id != product_id);
            }
            CartMutation::Clear => self.items.clear(),
        }
        Ok(())
    }

    fn add(&mut self, item: LineItem, available_stock: u32) -> Result<(), CartRuleError> {
        if item.quantity == 0 {
            return Err(CartRuleError::InvalidQuantity(item.quantity));
        }

        let check = |requested: u32, name: &str| {
            if requested > available_stock {
                return Err(CartRuleError::InsufficientStock {
                    name: name.to_owned(),
                    available: available_stock,
                    requested,
                });
            }
            Ok(requested)
        };

        // The first snapshot wins; re-adding only bumps the quantity.
        match self
            .items
            .iter_mut()
            .find(|line| line.product_id == item.product_id)
        {
            Some(line) => {
                line.quantity = check(line.quantity.saturating_add(item.quantity), &line.name)?;
            }
            None => {
                check(item.quantity, &item.name)?;
                self.items.push(item);
            }
        }
        Ok(())
    }

    fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartRuleError> {
        if quantity == 0 {
            let index = self
                .items
                .iter()
                .position(|line| line.product_id == product_id)
                .ok_or(CartRuleError::LineItemNotFound(product_id))?;
            self.items.remove(index);
            return Ok(());
        }

        let line = self
            .items
            .iter_mut()
            .find(|line| line.product_id == product_id)
            .ok_or(CartRuleError::LineItemNotFound(product_id))?;
        line.quantity = quantity;
        Ok(())
    }
}
